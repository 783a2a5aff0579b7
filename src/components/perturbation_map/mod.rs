//! Perturbation map: an interactive graph of compounds and the
//! perturbations between them.
//!
//! Data flows one way:
//! - [`store`] loads the snapshot once per session.
//! - [`filter`] resolves the [`Selection`] into the active subgraph and owns
//!   the derived render state table.
//! - [`layout`] positions the active subgraph, force-directed or layered.
//! - [`interaction`] overlays hover, pan and zoom state on the render table.
//! - [`render`] draws the result on a canvas.
//!
//! Everything except [`component`] and [`render`] is plain Rust with time
//! passed in explicitly, so the engine runs and tests without a browser.
//!
//! # Example
//!
//! ```ignore
//! use perturbation_map::{GraphStore, PerturbationMapCanvas, Selection};
//!
//! let store = RwSignal::new(GraphStore::default());
//! let selection = RwSignal::new(Selection::None);
//! view! { <PerturbationMapCanvas store=store selection=selection fullscreen=true /> }
//! ```

mod component;
pub mod editor;
pub mod filter;
pub mod interaction;
pub mod layout;
pub mod render;
pub mod scale;
pub mod search;
pub mod selection;
pub mod state;
pub mod store;
pub mod theme;
pub mod throttle;
pub mod types;

pub use component::PerturbationMapCanvas;
pub use filter::{ActiveSubgraph, VisibilityEngine, compute_active_subgraph};
pub use layout::{Layout, LayoutAlgorithm, LayoutConfig, compute_layout};
pub use search::{Operator, Rule, SearchTarget, evaluate};
pub use selection::{Selection, SelectionForm};
pub use state::PerturbationMapState;
pub use store::{DATA_ELEMENT_ID, GraphSource, GraphStore, LoadError};
pub use types::{Edge, EdgeId, GraphSnapshot, Node, NodeId, Property, PropertyValue};
