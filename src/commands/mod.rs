//! Bot commands.
//!
//! Every command works both as a slash command and with the configured prefix.

mod join;
mod leave;
mod now;
mod pause;
mod play;
mod queue;
mod repeat;
mod skip;
mod stop;
mod volume;

use crate::{Data, GramophoneError};

/// Convenient type alias for [poise::Command].
pub type Command = poise::Command<Data, GramophoneError>;

/// Lists all the implemented commands
pub fn list() -> Vec<Command> {
    vec![
        join::join(),
        join::summon(),
        leave::leave(),
        play::play(),
        pause::pause(),
        pause::resume(),
        stop::stop(),
        skip::skip(),
        queue::queue(),
        queue::shuffle(),
        queue::remove(),
        repeat::repeat(),
        volume::volume(),
        now::now(),
    ]
}
