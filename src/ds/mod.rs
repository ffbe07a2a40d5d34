pub mod intrusive_list;
pub mod slot_arena;
pub mod top_list;

pub use intrusive_list::IntrusiveList;
pub use slot_arena::{SlotArena, SlotId};
pub use top_list::{Offer, Rank, TopList};
