//! Command router
//!
//! Slash commands (`/start`, `/help`, `/setpin <code>`) are answered here;
//! every other text goes to the [`Dispatcher`]. Messages without text are
//! dropped.

use crate::audit::IncidentKind;
use crate::dispatcher::Dispatcher;
use crate::models::{is_access_code, InboundMessage, OutboundReply, ReplyKind, UserId};
use crate::prompts::BANK_NAME;
use crate::store::RecordStore;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const HELP_TEXT: &str = "Aquí tienes los comandos que entiendo:
/start - Inicia la conversación.
/help - Muestra esta ayuda.
/setpin - Agrega un PIN de 4 dígitos a tu cuenta. Ejemplo: `/setpin 1234`
Si me escribes cualquier otra cosa, intentaré ayudarte usando IA.";

pub const SETPIN_USAGE: &str = "Por favor, proporciona un PIN. Ejemplo: `/setpin 1234`";
pub const SETPIN_INVALID: &str = "El PIN debe ser numérico y de 4 dígitos. Ejemplo: `/setpin 1234`";
pub const SETPIN_DONE: &str = "¡Tu PIN ha sido configurado/actualizado!";
pub const SETPIN_NO_USER: &str =
    "No pude actualizar tu PIN. Asegúrate de haber iniciado el bot con /start primero.";
pub const SETPIN_ERROR: &str = "Ocurrió un error al intentar configurar tu PIN.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    SetPin(Option<String>),
    Unknown(String),
}

/// Parse a slash command. Returns `None` for ordinary text.
///
/// Accepts the `/command@BotName` form Telegram uses in groups.
pub fn parse_command(text: &str) -> Option<Command> {
    let text = text.trim();
    let rest = text.strip_prefix('/')?;

    let (head, arg) = match rest.split_once(char::is_whitespace) {
        Some((head, arg)) => (head, Some(arg.trim())),
        None => (rest, None),
    };
    let name = head.split('@').next().unwrap_or(head).to_lowercase();
    let arg = arg.filter(|a| !a.is_empty()).map(str::to_string);

    Some(match name.as_str() {
        "start" => Command::Start,
        "help" => Command::Help,
        "setpin" => Command::SetPin(arg),
        _ => Command::Unknown(name),
    })
}

pub struct CommandRouter {
    store: Arc<dyn RecordStore>,
    dispatcher: Arc<Dispatcher>,
}

impl CommandRouter {
    pub fn new(store: Arc<dyn RecordStore>, dispatcher: Arc<Dispatcher>) -> Self {
        Self { store, dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Produce the reply for one inbound message, if it has text.
    pub async fn route(&self, message: &InboundMessage) -> Option<OutboundReply> {
        let Some(text) = message.text.as_deref() else {
            warn!(user = %message.user_id, "Message without text content, ignoring");
            return None;
        };

        let reply = match parse_command(text) {
            Some(command) => self.run_command(message, command).await,
            None => {
                self.dispatcher
                    .handle(message.user_id, &message.display_name, text)
                    .await
            }
        };
        Some(reply)
    }

    async fn run_command(&self, message: &InboundMessage, command: Command) -> OutboundReply {
        info!(user = %message.user_id, ?command, "Command received");

        match command {
            Command::Start => self.start(message).await,
            Command::Help | Command::Unknown(_) => OutboundReply::new(ReplyKind::Command, HELP_TEXT),
            Command::SetPin(arg) => self.set_pin(message.user_id, arg.as_deref()).await,
        }
    }

    async fn start(&self, message: &InboundMessage) -> OutboundReply {
        if let Err(e) = self
            .store
            .upsert_user(message.user_id, &message.display_name)
            .await
        {
            error!(user = %message.user_id, "Failed to register user: {}", e);
            self.dispatcher
                .incidents()
                .record(message.user_id, IncidentKind::StoreUnavailable, e.to_string())
                .await;
        }

        OutboundReply::new(
            ReplyKind::Command,
            format!(
                "¡Hola {}! Bienvenido a {}, su banco de confianza.\nDime en qué puedo ayudarte hoy.",
                message.display_name, BANK_NAME
            ),
        )
    }

    async fn set_pin(&self, user: UserId, arg: Option<&str>) -> OutboundReply {
        let Some(code) = arg else {
            return OutboundReply::new(ReplyKind::Command, SETPIN_USAGE);
        };
        if !is_access_code(code) {
            return OutboundReply::new(ReplyKind::Command, SETPIN_INVALID);
        }

        match self.store.set_access_code(user, code).await {
            Ok(true) => {
                info!(%user, "Access code updated");
                OutboundReply::new(ReplyKind::Command, SETPIN_DONE)
            }
            Ok(false) => OutboundReply::new(ReplyKind::Command, SETPIN_NO_USER),
            Err(e) => {
                error!(%user, "Failed to set access code: {}", e);
                self.dispatcher
                    .incidents()
                    .record(user, IncidentKind::StoreUnavailable, e.to_string())
                    .await;
                OutboundReply::new(ReplyKind::StoreUnavailable, SETPIN_ERROR)
            }
        }
    }
}
