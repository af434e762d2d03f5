use crate::query_ast::Query;
use crate::result::ElabResult;
use async_trait::async_trait;
use graph_value::Value;
use std::fmt;
use std::sync::Arc;

/// The single effectful seam of the engine.
///
/// The compiler emits `Effect` nodes carrying a handler reference; the
/// runtime that walks the plan calls `run_effects` with the queries to
/// continue and their cursor seeds, and owns all scheduling, batching
/// and cancellation. The core itself has no suspension points.
#[async_trait]
pub trait EffectHandler: Send + Sync {
    async fn run_effects(&self, queries: Vec<(Query, Value)>) -> ElabResult<Vec<(Query, Value)>>;
}

/// A shareable handle to an effect handler, comparable by identity so
/// that plan trees containing effects stay comparable.
#[derive(Clone)]
pub struct EffectRef {
    handler: Arc<dyn EffectHandler>,
}

impl EffectRef {
    pub fn new(handler: Arc<dyn EffectHandler>) -> Self {
        EffectRef { handler }
    }

    pub fn handler(&self) -> &Arc<dyn EffectHandler> {
        &self.handler
    }
}

impl PartialEq for EffectRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.handler, &other.handler)
    }
}

impl fmt::Debug for EffectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EffectRef(<handler>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_ast::Query;

    struct Passthrough;

    #[async_trait]
    impl EffectHandler for Passthrough {
        async fn run_effects(
            &self,
            queries: Vec<(Query, Value)>,
        ) -> ElabResult<Vec<(Query, Value)>> {
            ElabResult::Success(queries)
        }
    }

    #[test]
    fn handler_runs_under_any_executor() {
        let handler = Passthrough;
        let input = vec![(Query::leaf("name"), Value::Null)];

        let result = futures::executor::block_on(handler.run_effects(input.clone()));
        assert_eq!(result, ElabResult::Success(input));
    }

    #[test]
    fn refs_compare_by_identity() {
        let shared: Arc<dyn EffectHandler> = Arc::new(Passthrough);
        let a = EffectRef::new(Arc::clone(&shared));
        let b = EffectRef::new(shared);
        let c = EffectRef::new(Arc::new(Passthrough));

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
