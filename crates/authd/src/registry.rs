//! Registered OAuth client applications

use std::sync::{Arc, Mutex};

/// A registered OAuth client application
///
/// Immutable once registered; the (client_id, redirect_uri) pair is unique
/// within the registry, the client_id alone is not.
#[derive(Debug)]
pub struct Application {
    pub client_id: String,
    pub redirect_uri: String,
    pub client_name: Option<String>,
    pub client_uri: Option<String>,
    pub logo_uri: Option<String>,
    pub tos_uri: Option<String>,
}

impl Application {
    pub fn new(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            client_name: None,
            client_uri: None,
            logo_uri: None,
            tos_uri: None,
        }
    }
}

/// In-memory store of registered applications
///
/// A single mutex covers every operation.
#[derive(Debug, Default)]
pub struct AppRegistry {
    applications: Mutex<Vec<Arc<Application>>>,
}

impl AppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an application, or return the existing entry for the same
    /// (client_id, redirect_uri) pair
    ///
    /// The first registration's fields are authoritative; re-registering the
    /// same pair does not update them.
    pub fn register(&self, application: Application) -> Arc<Application> {
        let mut applications = self.applications.lock().unwrap();

        if let Some(existing) = applications.iter().find(|app| {
            app.client_id == application.client_id && app.redirect_uri == application.redirect_uri
        }) {
            return Arc::clone(existing);
        }

        let application = Arc::new(application);
        applications.push(Arc::clone(&application));
        application
    }

    /// Look up an application by client_id, optionally pinned to an exact
    /// redirect_uri
    ///
    /// Without a redirect_uri the first registered entry for the client_id
    /// wins (insertion order).
    pub fn find(&self, client_id: &str, redirect_uri: Option<&str>) -> Option<Arc<Application>> {
        let applications = self.applications.lock().unwrap();

        applications
            .iter()
            .find(|app| {
                app.client_id == client_id
                    && redirect_uri.is_none_or(|uri| app.redirect_uri == uri)
            })
            .map(Arc::clone)
    }

    /// Number of registered applications
    pub fn len(&self) -> usize {
        self.applications.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_find_exact_pair() {
        let registry = AppRegistry::new();
        registry.register(Application::new("app1", "https://cb.example/cb"));

        let found = registry.find("app1", Some("https://cb.example/cb")).unwrap();
        assert_eq!(found.client_id, "app1");
        assert_eq!(found.redirect_uri, "https://cb.example/cb");
    }

    #[test]
    fn register_same_pair_returns_existing_entry() {
        let registry = AppRegistry::new();
        let mut first = Application::new("app1", "https://cb.example/cb");
        first.client_name = Some("First".to_string());
        registry.register(first);

        let mut again = Application::new("app1", "https://cb.example/cb");
        again.client_name = Some("Second".to_string());
        let resolved = registry.register(again);

        assert_eq!(registry.len(), 1);
        assert_eq!(resolved.client_name.as_deref(), Some("First"));
    }

    #[test]
    fn same_client_id_with_different_redirect_uris_coexist() {
        let registry = AppRegistry::new();
        registry.register(Application::new("app1", "https://one.example/cb"));
        registry.register(Application::new("app1", "https://two.example/cb"));

        assert_eq!(registry.len(), 2);
        assert!(registry.find("app1", Some("https://one.example/cb")).is_some());
        assert!(registry.find("app1", Some("https://two.example/cb")).is_some());
        assert!(registry.find("app1", Some("https://three.example/cb")).is_none());
    }

    #[test]
    fn find_without_redirect_uri_returns_first_registered() {
        let registry = AppRegistry::new();
        registry.register(Application::new("app1", "https://one.example/cb"));
        registry.register(Application::new("app1", "https://two.example/cb"));

        let found = registry.find("app1", None).unwrap();
        assert_eq!(found.redirect_uri, "https://one.example/cb");
    }

    #[test]
    fn find_unknown_client_id_is_none() {
        let registry = AppRegistry::new();
        registry.register(Application::new("app1", "https://cb.example/cb"));

        assert!(registry.find("nope", None).is_none());
        assert!(registry.find("nope", Some("https://cb.example/cb")).is_none());
    }
}
