use crate::service::waste::WasteService;

/**
* Represents the application state shared across the Actix web application.
*/
pub struct AppState {
    /**
     * The waste service for handling waste tracking operations.
     */
    pub waste_service: WasteService,
}

/**
 * Creates a new instance of `AppState`.
 *
 * # Arguments
 * `waste_service`: The waste service for handling waste tracking operations.
 */
impl AppState {
    pub fn new(waste_service: WasteService) -> Self {
        AppState { waste_service }
    }
}
