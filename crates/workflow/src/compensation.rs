//! Undo log for order creation.

use common::{OrderId, ProductId};
use store::MarketplaceStore;

/// A completed side effect of order creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompensationStep {
    OrderInserted(OrderId),
    StockDecremented { product: ProductId, quantity: u32 },
}

/// Records every completed step so a failed creation can be undone.
#[derive(Debug, Default)]
pub struct CompensationLog {
    steps: Vec<CompensationStep>,
}

impl CompensationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, step: CompensationStep) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[CompensationStep] {
        &self.steps
    }

    /// Undoes the recorded steps in reverse order.
    ///
    /// Every step is attempted even if an earlier one fails; failures are
    /// logged and counted. Returns the number of steps that could not be
    /// undone.
    #[tracing::instrument(skip_all, fields(steps = self.steps.len()))]
    pub async fn unwind<S: MarketplaceStore>(self, store: &S) -> usize {
        let mut failed = 0;

        for step in self.steps.into_iter().rev() {
            let result = match step {
                CompensationStep::StockDecremented { product, quantity } => store
                    .increment_stock(product, quantity)
                    .await
                    .map(|_| ()),
                CompensationStep::OrderInserted(order_id) => {
                    store.delete_order(order_id).await.map(|_| ())
                }
            };

            match result {
                Ok(()) => tracing::debug!(?step, "compensation step completed"),
                Err(e) => {
                    failed += 1;
                    metrics::counter!("compensation_failures_total").increment(1);
                    tracing::error!(?step, error = %e, "compensation step failed");
                }
            }
        }

        failed
    }
}
