//! Dispatcher
//!
//! Turns one inbound text into exactly one outbound reply:
//! pending code attempt → PIN Gate; sensitive intent → gate the request;
//! anything else → prompt the generation adapter.
//!
//! Messages from the same user are handled one at a time so the pending
//! slot cannot be raced; different users proceed concurrently.

use crate::audit::{user_fingerprint, IncidentKind, IncidentLog};
use crate::classifier::IntentClassifier;
use crate::gate::{GateOutcome, PendingActions, PinGate};
use crate::gemini::Generator;
use crate::models::{is_access_code, GenerationOutcome, Intent, OutboundReply, ReplyKind, UserId};
use crate::prompts;
use crate::store::RecordStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

pub const ASK_FOR_CODE: &str =
    "Por seguridad, por favor, envía tu PIN de 4 dígitos para continuar.";
pub const CODE_REQUIRED: &str = "Para esta acción necesitas un PIN. Por favor, configúralo con `/setpin TU_PIN_DE_4_DIGITOS` e intenta de nuevo.";
pub const CODE_NOT_CONFIGURED: &str = "Parece que no usaste /start para iniciar o no tienes un PIN configurado. Por favor, usa el comando `/setpin TU_PIN_DE_4_DIGITOS` para crear uno.";
pub const CODE_ACCEPTED: &str = "PIN correcto. Accediendo a tu información...";
pub const CODE_REJECTED: &str = "PIN incorrecto. Por seguridad, no se mostrará la información.";
pub const RETRIEVAL_FAILED: &str =
    "No pude recuperar la información solicitada en este momento. Intenta más tarde.";
pub const VERIFICATION_ERROR: &str = "Ocurrió un error al verificar tu PIN. Intenta de nuevo.";
pub const PREPARATION_ERROR: &str = "Hubo un problema al preparar la consulta. Intenta de nuevo.";
pub const GENERATION_BLOCKED: &str = "Mi intento de respuesta fue bloqueado";
pub const GENERATION_EMPTY: &str = "No pude generar una respuesta para eso en este momento, ¿podrías intentarlo de nuevo o reformular tu pregunta?";
pub const GENERATION_FAILED: &str =
    "Lo siento, ocurrió un error inesperado al procesar tu mensaje.\nIntenta de nuevo más tarde.";

/// Which gate transition produced an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GatePhase {
    Request,
    Verification,
}

pub struct Dispatcher {
    generator: Arc<dyn Generator>,
    gate: PinGate,
    incidents: IncidentLog,
    user_locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn RecordStore>, generator: Arc<dyn Generator>) -> Self {
        Self::with_state(store, generator, PendingActions::new(), IncidentLog::new())
    }

    /// Build over an injected pending registry and incident log.
    pub fn with_state(
        store: Arc<dyn RecordStore>,
        generator: Arc<dyn Generator>,
        pending: PendingActions,
        incidents: IncidentLog,
    ) -> Self {
        Self {
            generator,
            gate: PinGate::new(store, pending),
            incidents,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn gate(&self) -> &PinGate {
        &self.gate
    }

    pub fn incidents(&self) -> &IncidentLog {
        &self.incidents
    }

    pub async fn handle(&self, user: UserId, display_name: &str, text: &str) -> OutboundReply {
        let lock = self.user_lock(user).await;
        let reply = {
            let _guard = lock.lock().await;
            self.handle_in_turn(user, display_name, text).await
        };
        self.release_user_lock(user, lock).await;
        reply
    }

    async fn handle_in_turn(&self, user: UserId, display_name: &str, text: &str) -> OutboundReply {
        let text = text.trim();
        debug!(%user, "Handling message");

        // A 4-digit message is a code attempt whenever something is pending.
        if is_access_code(text) {
            if let Some(outcome) = self.gate.submit_code(user, text).await {
                return self.gate_reply(user, outcome, GatePhase::Verification).await;
            }
        }

        let intent = IntentClassifier::classify(text);
        info!(%user, ?intent, "Message classified");

        match intent.sensitive_action() {
            Some(action) => {
                let outcome = self.gate.request_access(user, action).await;
                self.gate_reply(user, outcome, GatePhase::Request).await
            }
            None => self.generate_reply(user, display_name, intent, text).await,
        }
    }

    async fn user_lock(&self, user: UserId) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().await;
        locks
            .entry(user)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Forget the user's lock once no other message holds or awaits it.
    async fn release_user_lock(&self, user: UserId, lock: Arc<Mutex<()>>) {
        let mut locks = self.user_locks.lock().await;
        // one reference in the map plus ours
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&user);
        }
    }

    async fn gate_reply(&self, user: UserId, outcome: GateOutcome, phase: GatePhase) -> OutboundReply {
        match outcome {
            GateOutcome::AwaitingCode(_) => OutboundReply::new(ReplyKind::PromptForCode, ASK_FOR_CODE),
            GateOutcome::CodeNotConfigured => match phase {
                GatePhase::Request => OutboundReply::new(ReplyKind::ConfigurationMissing, CODE_REQUIRED),
                GatePhase::Verification => {
                    OutboundReply::new(ReplyKind::ConfigurationMissing, CODE_NOT_CONFIGURED)
                }
            },
            GateOutcome::Released(data) => OutboundReply::new(
                ReplyKind::Delivered,
                format!("{}\n\n{}", CODE_ACCEPTED, data),
            ),
            GateOutcome::RetrievalFailed => {
                warn!(%user, "Verified retrieval returned no data");
                OutboundReply::new(ReplyKind::RetrievalFailure, RETRIEVAL_FAILED)
            }
            GateOutcome::Denied => OutboundReply::new(ReplyKind::VerificationFailure, CODE_REJECTED),
            GateOutcome::StoreUnavailable(e) => {
                error!(user = %user_fingerprint(user), ?phase, "Record store failure: {}", e);
                self.incidents
                    .record(user, IncidentKind::StoreUnavailable, e.to_string())
                    .await;
                let text = match phase {
                    GatePhase::Request => PREPARATION_ERROR,
                    GatePhase::Verification => VERIFICATION_ERROR,
                };
                OutboundReply::new(ReplyKind::StoreUnavailable, text)
            }
        }
    }

    async fn generate_reply(
        &self,
        user: UserId,
        display_name: &str,
        intent: Intent,
        text: &str,
    ) -> OutboundReply {
        let prompt = prompts::build_prompt(intent, display_name, text);

        match self.generator.complete(&prompt).await {
            GenerationOutcome::Delivered(answer) => OutboundReply::new(ReplyKind::Generated, answer),
            GenerationOutcome::Blocked(reason) => {
                warn!(%user, %reason, "Generation blocked");
                OutboundReply::new(
                    ReplyKind::GenerationBlocked,
                    format!(
                        "{} ({}). Por favor, intenta reformular tu pregunta.",
                        GENERATION_BLOCKED, reason
                    ),
                )
            }
            GenerationOutcome::Empty => {
                warn!(%user, "Generation returned an empty response");
                OutboundReply::new(ReplyKind::GenerationEmpty, GENERATION_EMPTY)
            }
            GenerationOutcome::Failed(detail) => {
                error!(user = %user_fingerprint(user), "Generation failed: {}", detail);
                self.incidents
                    .record(user, IncidentKind::GenerationFailure, detail)
                    .await;
                OutboundReply::new(ReplyKind::GenerationFailure, GENERATION_FAILED)
            }
        }
    }
}
