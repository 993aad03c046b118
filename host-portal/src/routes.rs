use axum::response::Redirect;
use std::fmt;

/// Pages of the portal that workflow code navigates between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Host,
    HostRegistration,
    HostApplicationStatus,
    RegisterProperty,
    EditProperty(i64),
    MyAccommodations,
    AccommodationStatus(i64),
    AdminHostRequests,
    AdminAccommodations,
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::Host => "/host".to_string(),
            Route::HostRegistration => "/host-registration".to_string(),
            Route::HostApplicationStatus => "/host-application-status".to_string(),
            Route::RegisterProperty => "/register-property".to_string(),
            Route::EditProperty(id) => format!("/register-property/{}", id),
            Route::MyAccommodations => "/my-accommodations".to_string(),
            Route::AccommodationStatus(id) => format!("/accommodation-status/{}", id),
            Route::AdminHostRequests => "/admin/host-requests".to_string(),
            Route::AdminAccommodations => "/admin/accommodations".to_string(),
        }
    }

    /// `303 See Other` to this page.
    pub fn redirect(&self) -> Redirect {
        Redirect::to(&self.path())
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Login page that sends the user back to `return_to` after signing in.
pub fn login_url(return_to: &str) -> String {
    match serde_urlencoded::to_string([("from", return_to)]) {
        Ok(query) => format!("/login?{}", query),
        Err(_) => Route::Login.path(),
    }
}
