mod blocking;
mod http;
mod local;
mod traits;

pub use blocking::BlockingHttpService;
pub use http::HttpService;
pub use local::LocalService;
pub use traits::{group_images, ServiceError, TicketQuery, TicketService};
