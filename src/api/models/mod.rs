// Models module - contains Product, Flow, destination vocabulary, generation results and runs

pub mod destination;
pub mod flow;
pub mod generation;
pub mod product;
pub mod run;

pub use destination::{Destination, DestinationSet};
pub use flow::{Flow, FlowDraft, FlowTemplate, SelectionType};
pub use generation::GenerationResult;
pub use product::{CollectionRef, Facets, Product, UserError};
pub use run::{ApplyStatus, Run, RunProduct, RunState};
