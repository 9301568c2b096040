pub mod event;

pub use event::{
    BoundingBox, DomLocator, ElementSnapshot, Event, EventPayload, Interaction, NavigationData,
    ScrollData, Viewport,
};
