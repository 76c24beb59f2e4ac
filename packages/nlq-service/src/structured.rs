use std::{cmp::Reverse, collections::BTreeMap};

use serde::Serialize;
use time::Date;

use nlq_domain::{AgeGroup, DocumentType, Gender, PersonFilter, PersonRecord};

use crate::{Error, Intent, NlqService, Result};

/// A registry record plus its age on the day of the query.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PersonView {
	#[serde(flatten)]
	pub person: PersonRecord,
	pub age: u32,
}
impl PersonView {
	pub fn new(person: PersonRecord, today: Date) -> Self {
		let age = person.age_on(today);

		Self { person, age }
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchMatch {
	#[serde(flatten)]
	pub person: PersonView,
	pub score: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Stats {
	pub total: u64,
	pub by_gender: BTreeMap<String, u64>,
	pub by_document_type: BTreeMap<String, u64>,
	pub by_age_group: BTreeMap<String, u64>,
	pub min_age: Option<u32>,
	pub avg_age: Option<f64>,
	pub max_age: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryData {
	Person(PersonView),
	Count { count: u64 },
	Stats(Stats),
	Matches(Vec<SearchMatch>),
}

/// Answer text and data for one executed intent.
#[derive(Clone, Debug, PartialEq)]
pub struct Answer {
	pub text: String,
	pub data: Option<QueryData>,
}

const NO_RECORDS: &str = "No se encontraron personas registradas.";

/// Minimum age; equal ages go to the smallest id.
pub fn youngest(persons: &[PersonRecord], today: Date) -> Option<PersonView> {
	persons
		.iter()
		.min_by_key(|person| (person.age_on(today), person.id))
		.map(|person| PersonView::new(person.clone(), today))
}

/// Maximum age; equal ages go to the smallest id.
pub fn oldest(persons: &[PersonRecord], today: Date) -> Option<PersonView> {
	persons
		.iter()
		.min_by_key(|person| (Reverse(person.age_on(today)), person.id))
		.map(|person| PersonView::new(person.clone(), today))
}

/// Single pass over the population. Every breakdown lists every category, zeros included.
pub fn compute_stats(persons: &[PersonRecord], today: Date) -> Stats {
	let mut by_gender: BTreeMap<String, u64> =
		Gender::ALL.iter().map(|gender| (gender.label().to_string(), 0)).collect();
	let mut by_document_type: BTreeMap<String, u64> = DocumentType::ALL
		.iter()
		.map(|document_type| (document_type.label().to_string(), 0))
		.collect();
	let mut by_age_group: BTreeMap<String, u64> =
		AgeGroup::ALL.iter().map(|group| (group.as_str().to_string(), 0)).collect();
	let mut min_age: Option<u32> = None;
	let mut max_age: Option<u32> = None;
	let mut age_sum = 0_u64;

	for person in persons {
		let age = person.age_on(today);

		bump(&mut by_gender, person.gender.label());
		bump(&mut by_document_type, person.document_type.label());
		bump(&mut by_age_group, AgeGroup::for_age(age).as_str());

		min_age = Some(min_age.map_or(age, |current| current.min(age)));
		max_age = Some(max_age.map_or(age, |current| current.max(age)));
		age_sum += u64::from(age);
	}

	let total = persons.len() as u64;
	let avg_age = (total > 0).then(|| round_tenths(age_sum as f64 / total as f64));

	Stats { total, by_gender, by_document_type, by_age_group, min_age, avg_age, max_age }
}

fn bump(counts: &mut BTreeMap<String, u64>, key: &str) {
	if let Some(count) = counts.get_mut(key) {
		*count += 1;
	}
}

fn round_tenths(value: f64) -> f64 {
	(value * 10.0).round() / 10.0
}

fn format_age(value: f64) -> String {
	if value.fract() == 0.0 { format!("{value:.0}") } else { format!("{value:.1}") }
}

pub fn youngest_answer(view: Option<&PersonView>) -> String {
	match view {
		Some(view) => format!(
			"La persona más joven registrada es {}, con {} años.",
			view.person.full_name(),
			view.age
		),
		None => NO_RECORDS.to_string(),
	}
}

pub fn oldest_answer(view: Option<&PersonView>) -> String {
	match view {
		Some(view) => format!(
			"La persona de mayor edad registrada es {}, con {} años.",
			view.person.full_name(),
			view.age
		),
		None => NO_RECORDS.to_string(),
	}
}

pub fn count_answer(count: u64, filter: &PersonFilter) -> String {
	if filter.is_empty() {
		format!("En el sistema hay {count} personas registradas.")
	} else {
		format!("Se encontraron {count} personas con los criterios especificados.")
	}
}

pub fn stats_answer(stats: &Stats) -> String {
	let Some(avg_age) = stats.avg_age else {
		return "No hay personas registradas que coincidan para calcular estadísticas.".to_string();
	};
	let gender = |gender: Gender| stats.by_gender.get(gender.label()).copied().unwrap_or(0);

	format!(
		"En el sistema hay {} personas registradas. {} son de género masculino, {} femenino, {} no \
		 binario y {} prefieren no reportarlo. La edad promedio es de {} años.",
		stats.total,
		gender(Gender::Male),
		gender(Gender::Female),
		gender(Gender::NonBinary),
		gender(Gender::Undisclosed),
		format_age(avg_age),
	)
}

impl NlqService {
	/// Runs a structured intent against the registry. Registry failures are not retried.
	pub async fn execute_structured(&self, intent: &Intent, today: Date) -> Result<Answer> {
		match intent {
			Intent::Youngest | Intent::Oldest => {
				let persons =
					self.registry_call(self.registry.list(&PersonFilter::default())).await?;
				let (view, text) = if matches!(intent, Intent::Youngest) {
					let view = youngest(&persons, today);
					let text = youngest_answer(view.as_ref());

					(view, text)
				} else {
					let view = oldest(&persons, today);
					let text = oldest_answer(view.as_ref());

					(view, text)
				};

				Ok(Answer { text, data: view.map(QueryData::Person) })
			},
			Intent::Count { filter } => {
				let count = self.registry_call(self.registry.count(filter)).await?;

				Ok(Answer {
					text: count_answer(count, filter),
					data: Some(QueryData::Count { count }),
				})
			},
			Intent::Stats { filter } => {
				let persons = self.registry_call(self.registry.list(filter)).await?;
				let stats = compute_stats(&persons, today);

				Ok(Answer { text: stats_answer(&stats), data: Some(QueryData::Stats(stats)) })
			},
			Intent::Search { .. } => Err(Error::Internal {
				message: "Search intents are not executed against the registry.".to_string(),
			}),
		}
	}
}

#[cfg(test)]
mod tests {
	use time::macros::{date, datetime};

	use super::*;

	fn person(id: i64, birth_date: Date, gender: Gender) -> PersonRecord {
		PersonRecord {
			id,
			document_number: format!("{id:04}"),
			document_type: DocumentType::CitizenId,
			first_name: format!("P{id}"),
			second_name: None,
			surnames: "Prueba".to_string(),
			birth_date,
			gender,
			email: format!("p{id}@example.com"),
			phone: "3000000000".to_string(),
			photo_url: None,
			created_at: datetime!(2024-01-01 0:00 UTC),
			updated_at: datetime!(2024-01-01 0:00 UTC),
		}
	}

	const TODAY: Date = date!(2026 - 10 - 18);

	#[test]
	fn age_ties_go_to_the_smallest_id() {
		// Both are 25 today even though their birth dates differ.
		let persons = vec![
			person(9, date!(2001 - 01 - 05), Gender::Male),
			person(4, date!(2001 - 09 - 30), Gender::Female),
			person(7, date!(1950 - 02 - 02), Gender::Male),
			person(2, date!(1950 - 07 - 07), Gender::Female),
		];

		assert_eq!(youngest(&persons, TODAY).map(|view| view.person.id), Some(4));
		assert_eq!(oldest(&persons, TODAY).map(|view| view.person.id), Some(2));
	}

	#[test]
	fn empty_registry_has_no_extremes() {
		assert!(youngest(&[], TODAY).is_none());
		assert_eq!(oldest_answer(None), NO_RECORDS);
	}

	#[test]
	fn stats_list_every_category() {
		let stats = compute_stats(&[person(1, date!(2015 - 01 - 01), Gender::Female)], TODAY);

		assert_eq!(stats.total, 1);
		assert_eq!(stats.by_gender.len(), Gender::ALL.len());
		assert_eq!(stats.by_document_type.len(), DocumentType::ALL.len());
		assert_eq!(stats.by_age_group.len(), AgeGroup::ALL.len());
		assert_eq!(stats.by_gender["Femenino"], 1);
		assert_eq!(stats.by_gender["No binario"], 0);
		assert_eq!(stats.by_age_group["minor"], 1);
		assert_eq!(stats.by_document_type["Tarjeta de identidad"], 0);
		assert_eq!((stats.min_age, stats.max_age), (Some(11), Some(11)));
	}

	#[test]
	fn empty_population_yields_zero_counts_and_null_ages() {
		let stats = compute_stats(&[], TODAY);
		let json = serde_json::to_value(&stats).expect("Failed to serialize stats.");

		assert_eq!(stats.total, 0);
		assert!(stats.by_gender.values().all(|count| *count == 0));
		assert!(json["min_age"].is_null());
		assert!(json["avg_age"].is_null());
		assert!(json["max_age"].is_null());
	}

	#[test]
	fn average_age_is_rounded_to_tenths() {
		let persons = vec![
			person(1, date!(2000 - 01 - 01), Gender::Male),
			person(2, date!(2000 - 01 - 01), Gender::Male),
			person(3, date!(1999 - 01 - 01), Gender::Male),
		];
		let stats = compute_stats(&persons, TODAY);

		// Ages 26, 26 and 27.
		assert_eq!(stats.avg_age, Some(26.3));
		assert!(stats_answer(&stats).contains("La edad promedio es de 26.3 años."));
	}
}
