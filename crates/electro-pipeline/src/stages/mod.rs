//! Built-in pipeline stages.
//!
//! The default application pipeline registers these under fixed keys so
//! modules can anchor their own handlers around them:
//!
//! | Key             | Stage                 |
//! |-----------------|-----------------------|
//! | `requestId`     | [`RequestIdHandler`]  |
//! | `errorHandling` | [`ErrorHandler`]      |
//! | `session`       | [`FlashHandler`]      |
//! | `router`        | application routes    |
//! | `notFound`      | [`NotFoundHandler`]   |

mod error_handling;
mod not_found;
mod request_id;
mod session;

pub use error_handling::{ErrorHandler, HandledError, DEFAULT_INTERNAL_MESSAGE};
pub use not_found::NotFoundHandler;
pub use request_id::{RequestIdHandler, REQUEST_ID_HEADER};
pub use session::{
    FlashHandler, FlashStore, MemoryFlashStore, PendingFlash, ANONYMOUS_SESSION,
    DEFAULT_FLASH_CAPACITY, DEFAULT_SESSION_HEADER,
};

/// Key of the request ID stage.
pub const REQUEST_ID_KEY: &str = "requestId";
/// Key of the error rendering stage.
pub const ERROR_HANDLING_KEY: &str = "errorHandling";
/// Key of the flash message stage.
pub const SESSION_KEY: &str = "session";
/// Key of the application route table.
pub const ROUTER_KEY: &str = "router";
/// Key of the 404 fallback.
pub const NOT_FOUND_KEY: &str = "notFound";
