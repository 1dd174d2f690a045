//! Event handling

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use songbird::events::context_data::DisconnectKind;
use songbird::Call;
use songbird::CoreEvent;
use songbird::Event;
use songbird::EventContext;
use songbird::EventHandler;
use tokio::sync::Mutex;

use super::call::get_manager;
use super::call::CallRef;
use super::call::Manager;
use crate::error::UserError;
use crate::player::SessionRegistry;
use crate::serenity::GuildId;
use crate::Context;
use crate::GramophoneError;

/// Initialize global events.
/// Only initializes if a [songbird::Call] hasn't been initialized yet.
pub async fn init_global_events(ctx: &Context<'_>) -> Result<CallRef, GramophoneError> {
    let manager = get_manager(ctx).await?;
    let guild_id = ctx.guild_id().ok_or(UserError::GuildOnly)?;
    // Only init if call hasn't been initialized
    let call = match manager.get(guild_id) {
        Some(call) => call,
        None => {
            let call = manager.get_or_insert(guild_id);

            tracing::info!("Initializing global events.");
            let dc_event = DestroyOnDisconnect::new(
                ctx.data().sessions.clone(),
                manager.clone(),
                guild_id,
                &call,
            );
            dc_event.register(&call).await;
            call
        }
    };
    Ok(call)
}

/// Destroy the guild's session when the bot disconnects.
/// 'Destroying' means:
/// - End anything currently playing.
/// - Clear the queue.
/// - Drop the session from the registry, the next command starts a fresh one.
///
/// Only acts while its call is the one the manager holds for the guild.
/// A call removed by `/leave` or an idle shutdown reports its disconnect late,
/// possibly after a new call and session were started.
struct DestroyOnDisconnect {
    sessions: SessionRegistry,
    manager: Manager,
    guild_id: GuildId,
    /// The call this handler is registered on. Weak, the call owns the handler.
    call: Weak<Mutex<Call>>,
}

impl DestroyOnDisconnect {
    /// Constructor for [DestroyOnDisconnect]
    fn new(sessions: SessionRegistry, manager: Manager, guild_id: GuildId, call: &CallRef) -> Self {
        Self {
            sessions,
            manager,
            guild_id,
            call: Arc::downgrade(call),
        }
    }

    /// Register this as a global event.
    async fn register(self, call: &CallRef) {
        tracing::debug!("Registering destroy on disconnect global event.");
        let mut call = call.lock().await;
        call.add_global_event(Event::Core(CoreEvent::DriverDisconnect), self);
    }
}

#[async_trait]
impl EventHandler for DestroyOnDisconnect {
    async fn act(&self, ectx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::DriverDisconnect(data) = ectx {
            // Failed connection attempts are retried by songbird.
            if matches!(data.kind, DisconnectKind::Connect) {
                return None;
            }
            if !is_same_call(self.manager.get(self.guild_id).as_ref(), &self.call) {
                tracing::debug!("Ignoring disconnect of a removed call: {:?}", data.reason);
                return None;
            }
            tracing::info!("Disconnected from voice: {:?}", data.reason);
        }

        if self.sessions.destroy(self.guild_id).await {
            tracing::debug!("Destroyed session on disconnect.");
        }
        None
    }
}

/// Whether `live` is the allocation `registered` points to.
fn is_same_call<T>(live: Option<&Arc<T>>, registered: &Weak<T>) -> bool {
    live.is_some_and(|live| std::ptr::eq(Arc::as_ptr(live), registered.as_ptr()))
}
