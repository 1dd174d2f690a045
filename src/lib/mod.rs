//! Glue between the player and discord.

pub mod announce;
pub mod call;
pub mod events;
pub mod youtube;
