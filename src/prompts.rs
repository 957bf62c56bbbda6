//! Prompt templates for non-sensitive messages

use crate::models::Intent;

pub const BANK_NAME: &str = "IceCash";

/// Product facts the model may quote for general inquiries.
const PRODUCT_FACTS: &str = r#"Tarjetas: "Valo Card" (débito nacional), "Mine Card" (crédito nacional), "Vault Card" (crédito internacional).
Tasa préstamo promedio Uruguay: ~35% TEA (varía).
Plazos fijos: en Pesos y Dólares, tasas competitivas."#;

/// Build the prompt for a general-info or fallback message.
///
/// Sensitive intents never reach the model; they are answered with the
/// fallback template if passed here.
pub fn build_prompt(intent: Intent, display_name: &str, text: &str) -> String {
    match intent {
        Intent::GeneralInfo => general_info_prompt(display_name, text),
        Intent::BalanceQuery | Intent::LoanQuery | Intent::Fallback => {
            fallback_prompt(display_name, text)
        }
    }
}

fn general_info_prompt(display_name: &str, text: &str) -> String {
    format!(
        r#"Eres un asistente amigable de {bank}.
Un usuario ({name}) te ha enviado el siguiente mensaje: "{text}"
Tu tarea es responder a su consulta general sobre productos o servicios bancarios.
{facts}
Responde directamente al usuario con naturalidad."#,
        bank = BANK_NAME,
        name = display_name,
        text = text,
        facts = PRODUCT_FACTS,
    )
}

fn fallback_prompt(display_name: &str, text: &str) -> String {
    format!(
        r#"Eres un asistente amigable de {bank}.
Un usuario ({name}) te ha enviado el siguiente mensaje: "{text}"
Tu tarea es responder a la consulta del usuario de forma útil y CONCISA.
Si no entiendes la pregunta o parece no estar relacionada con temas bancarios, dile que no estás seguro de cómo ayudar con eso y recuérdale los temas principales sobre los que puede consultar: información sobre nuestros productos (tarjetas, plazos fijos, tasas de interés) o cómo usar los comandos del bot. También puede pedir ayuda con /help.
Si la pregunta es muy general o no encaja en categorías específicas, intenta ser útil o pide que reformule.
Anímale a preguntar. Responde directamente al usuario con naturalidad."#,
        bank = BANK_NAME,
        name = display_name,
        text = text,
    )
}
