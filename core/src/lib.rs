pub mod maps;
pub mod model;
pub mod notify;
pub mod pipeline;
pub mod reserves;

pub use maps::MapTable;
pub use model::{Availability, AvailabilityResponse, CatalogRecord, Item, RequestOption, SolrResponse};
pub use pipeline::{decorate, Caller, PipelineContext};
