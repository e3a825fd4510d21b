//! Specialized collection types

pub use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Arena slot of a live entity inside a scene's entity table
    pub struct EntitySlot;
}

/// Arena holding entity storage; ids map onto these slots
pub type EntityArena<T> = SlotMap<EntitySlot, T>;
