use authforge_application::LoginOrchestrator;

/// Shared application state: the one application-layer type a transport
/// should depend on.
#[derive(Clone)]
pub struct AppState {
    pub login_orchestrator: LoginOrchestrator,
}
