//! Shared application state.

use std::sync::Arc;

use domain::{MessageSet, NotificationFactory};
use store::MarketplaceStore;
use workflow::{NotificationBus, NotificationDispatcher, NotificationService, OrderWorkflow};

use crate::auth::IdentityVerifier;

/// Shared application state accessible from all handlers.
pub struct AppState<S: MarketplaceStore> {
    pub workflow: OrderWorkflow<S>,
    pub notifications: NotificationService<S>,
    pub bus: NotificationBus,
    pub verifier: Arc<dyn IdentityVerifier>,
}

impl<S: MarketplaceStore> AppState<S> {
    /// Wires the workflow and notification services around one store.
    pub fn new(
        store: S,
        messages: MessageSet,
        bus: NotificationBus,
        verifier: Arc<dyn IdentityVerifier>,
    ) -> Self {
        let dispatcher =
            NotificationDispatcher::new(store.clone(), NotificationFactory::new(messages), bus.clone());

        Self {
            workflow: OrderWorkflow::new(store.clone(), dispatcher.clone()),
            notifications: NotificationService::new(store, dispatcher),
            bus,
            verifier,
        }
    }

    pub fn store(&self) -> &S {
        self.workflow.store()
    }
}
