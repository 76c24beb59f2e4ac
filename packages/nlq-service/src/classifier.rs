use serde_json::Value;

use crate::{
	NlqService, Result,
	intent::{self, IntentDescriptor},
};

const CLASSIFIER_INSTRUCTIONS: &str = "\
Eres un clasificador de consultas sobre un registro de personas.
Los registros tienen: primer_nombre, segundo_nombre, apellidos, numero_documento, tipo_documento, \
fecha_nacimiento, genero, correo_electronico, celular.
Responde ÚNICAMENTE con un objeto JSON: {\"intent\": \"...\", \"parameters\": {...}, \"confidence\": 0.0-1.0}

Intenciones permitidas:
- \"youngest\": la persona más joven. Sin parámetros.
- \"oldest\": la persona de mayor edad. Sin parámetros.
- \"count\": contar personas. Parámetros opcionales: \"genero\" (Masculino, Femenino, No binario, \
Prefiero no reportar) y \"tipo_documento\" (Tarjeta de identidad, Cédula).
- \"stats\": estadísticas generales. Mismos parámetros opcionales que \"count\".
- \"search\": búsqueda semántica. Parámetros opcionales: \"text\" (texto a buscar) y \"limit\" \
(número de resultados).

Ejemplos:
- \"¿Cuántas mujeres hay?\" → {\"intent\": \"count\", \"parameters\": {\"genero\": \"Femenino\"}}
- \"¿Quién es la persona más joven?\" → {\"intent\": \"youngest\", \"parameters\": {}}
- \"personas con correo de gmail\" → {\"intent\": \"search\", \"parameters\": {\"text\": \"correo gmail\"}}";

pub fn build_messages(question: &str) -> Vec<Value> {
	vec![
		serde_json::json!({ "role": "system", "content": CLASSIFIER_INSTRUCTIONS }),
		serde_json::json!({ "role": "user", "content": question }),
	]
}

impl NlqService {
	/// One classification attempt. Retries and degradation are the caller's call.
	pub async fn classify(&self, question: &str) -> Result<IntentDescriptor> {
		let messages = build_messages(question);
		let raw = self
			.providers
			.classifier
			.complete(&self.cfg.providers.llm_classifier, &messages)
			.await?;
		let descriptor = intent::parse_descriptor(&raw, question)?;

		tracing::debug!(
			intent = descriptor.intent.kind().as_str(),
			confidence = ?descriptor.confidence,
			"Classified question."
		);

		Ok(descriptor)
	}
}
