//! Document rendering.
//!
//! Each stored vector gets a compact line-oriented text document derived
//! from the payload. The first line always names the module; every other
//! line is `Label: value` for a field that is actually present, so the
//! embedding never sees placeholder noise. Line orders are fixed per module
//! to keep re-ingestion byte-stable.

use serde_json::Value;

use crate::{Module, payload};

/// Upper bound on dumped fields for unrecognized payload shapes.
const MAX_GENERIC_FIELDS: usize = 20;

/// Renders the retrieval document for one CRM record.
pub fn build_document(module: Module, payload: &Value) -> String {
	let lines = match module {
		Module::Leads => lead_lines(payload),
		Module::Contacts => contact_lines(payload),
		Module::Accounts => account_lines(payload),
		Module::Deals => deal_lines(payload),
		Module::Notes => note_lines(payload),
		Module::Tasks => task_lines(payload),
		Module::Calls => call_lines(payload),
		Module::Meetings => meeting_lines(payload),
		Module::Projects => project_lines(payload),
		Module::Emails => email_lines(payload),
		Module::WorkDrive => file_lines(payload, None),
		Module::Unknown => generic_lines(payload),
	};

	compose(module, lines)
}

/// Renders the document for one file chunk. `chunk` is the window text; the
/// surrounding lines give the retriever the file's path and link.
pub fn build_file_document(payload: &Value, chunk: &str) -> String {
	compose(Module::WorkDrive, file_lines(payload, Some(chunk)))
}

fn compose(module: Module, lines: Vec<Option<String>>) -> String {
	let mut out = vec![format!("Module: {}", module.as_str())];

	out.extend(lines.into_iter().flatten());

	out.join("\n")
}

fn labeled(label: &str, value: Option<String>) -> Option<String> {
	value.map(|value| format!("{label}: {value}"))
}

fn joined(payload: &Value, fields: &[&str]) -> Option<String> {
	let parts =
		fields.iter().filter_map(|field| payload::text_at(payload, field)).collect::<Vec<_>>();

	(!parts.is_empty()).then(|| parts.join(", "))
}

fn lead_lines(p: &Value) -> Vec<Option<String>> {
	vec![
		labeled("Name", payload::first_text(p, &["Lead_Name", "Full_Name", "Name"])),
		labeled("Company", payload::text_at(p, "Company")),
		labeled("Status", payload::text_at(p, "Lead_Status")),
		labeled("Email", payload::text_at(p, "Email")),
		labeled("Phone", payload::text_at(p, "Phone")),
		labeled("Notes", payload::text_at(p, "Description")),
	]
}

fn contact_lines(p: &Value) -> Vec<Option<String>> {
	let name = payload::first_text(p, &["Full_Name", "Contact_Name"]).or_else(|| {
		let joined = [payload::text_at(p, "First_Name"), payload::text_at(p, "Last_Name")]
			.into_iter()
			.flatten()
			.collect::<Vec<_>>()
			.join(" ");

		(!joined.is_empty()).then_some(joined)
	});

	vec![
		labeled("Name", name),
		labeled("Email", payload::text_at(p, "Email")),
		labeled("Phone", payload::text_at(p, "Phone")),
		labeled(
			"Address",
			joined(p, &["Mailing_Street", "Mailing_City", "Mailing_State", "Mailing_Zip"]),
		),
		labeled("Account", payload::text_at(p, "Account_Name")),
		labeled("Notes", payload::text_at(p, "Description")),
	]
}

fn account_lines(p: &Value) -> Vec<Option<String>> {
	vec![
		labeled("Account", payload::text_at(p, "Account_Name")),
		labeled("Industry", payload::text_at(p, "Industry")),
		labeled("Phone", payload::text_at(p, "Phone")),
		labeled("Website", payload::text_at(p, "Website")),
		labeled(
			"Address",
			joined(p, &["Billing_Street", "Billing_City", "Billing_State", "Billing_Code"]),
		),
		labeled("Notes", payload::text_at(p, "Description")),
	]
}

fn deal_lines(p: &Value) -> Vec<Option<String>> {
	vec![
		labeled("Deal Name", payload::text_at(p, "Deal_Name")),
		labeled("Stage", payload::text_at(p, "Stage")),
		labeled("Amount", payload::text_at(p, "Amount")),
		payload::text_at(p, "Probability").map(|v| format!("Probability: {v}%")),
		labeled("Next Step", payload::text_at(p, "Next_Step")),
		labeled("Description", payload::text_at(p, "Description")),
		labeled("Email", payload::text_at(p, "Email")),
		labeled("Phone", payload::text_at(p, "Phone")),
		labeled("Address", joined(p, &["Street", "City", "Zip_Code"])),
		labeled("Account", payload::text_at(p, "Account_Name")),
	]
}

fn note_lines(p: &Value) -> Vec<Option<String>> {
	vec![
		labeled("Title", payload::text_at(p, "Note_Title")),
		labeled("Content", payload::text_at(p, "Note_Content")),
		labeled("Related To", payload::text_at(p, "Parent_Id")),
	]
}

fn task_lines(p: &Value) -> Vec<Option<String>> {
	vec![
		labeled("Subject", payload::text_at(p, "Subject")),
		labeled("Due", payload::text_at(p, "Due_Date")),
		labeled("Status", payload::text_at(p, "Status")),
		labeled("Notes", payload::text_at(p, "Description")),
	]
}

fn call_lines(p: &Value) -> Vec<Option<String>> {
	vec![
		labeled("Subject", payload::text_at(p, "Subject")),
		labeled("When", payload::text_at(p, "Call_Start_Time")),
		labeled("Duration", payload::text_at(p, "Call_Duration")),
		labeled("Result", payload::text_at(p, "Call_Result")),
		labeled("Notes", payload::text_at(p, "Description")),
		labeled("Phone", payload::text_at(p, "Phone")),
	]
}

fn meeting_lines(p: &Value) -> Vec<Option<String>> {
	vec![
		labeled("Title", payload::first_text(p, &["Subject", "Event_Title", "Title"])),
		labeled("Start", payload::first_text(p, &["Start_DateTime", "Start_Time"])),
		labeled("End", payload::first_text(p, &["End_DateTime", "End_Time"])),
		labeled("Location", payload::text_at(p, "Location")),
		labeled("Notes", payload::text_at(p, "Description")),
	]
}

fn project_lines(p: &Value) -> Vec<Option<String>> {
	vec![
		labeled("Project", payload::text_at(p, "Project_Name")),
		labeled("Status", payload::text_at(p, "Status")),
		labeled("Owner", payload::text_at(p, "Owner")),
		labeled("Start", payload::text_at(p, "Start_Date")),
		labeled("End", payload::text_at(p, "End_Date")),
		labeled("Notes", payload::text_at(p, "Description")),
	]
}

fn email_lines(p: &Value) -> Vec<Option<String>> {
	let participants = [
		payload::text_at(p, "From"),
		payload::text_at(p, "To"),
		payload::text_at(p, "Cc"),
	]
	.into_iter()
	.flatten()
	.collect::<Vec<_>>();

	vec![
		labeled("Subject", payload::text_at(p, "Subject")),
		(!participants.is_empty()).then(|| format!("Participants: {}", participants.join(" | "))),
		labeled("Body", payload::first_text(p, &["Snippet", "Body"])),
		labeled("Date", payload::text_at(p, "Date")),
	]
}

fn file_lines(p: &Value, chunk: Option<&str>) -> Vec<Option<String>> {
	vec![
		labeled("Path", payload::text_at(p, "Path")),
		labeled("File", payload::text_at(p, "Name")),
		labeled("Size", payload::text_at(p, "Size")),
		labeled("URL", payload::text_at(p, "Url")),
		chunk.map(str::trim).filter(|c| !c.is_empty()).map(|c| format!("Content:\n{c}")),
	]
}

/// Unrecognized shapes: prefer the common identity-adjacent fields, and only
/// dump everything when none of them are present.
fn generic_lines(p: &Value) -> Vec<Option<String>> {
	let common = vec![
		labeled("Company", payload::text_at(p, "Company")),
		labeled("Email", payload::text_at(p, "Email")),
		labeled("Phone", payload::text_at(p, "Phone")),
		labeled("Notes", payload::text_at(p, "Description")),
	];

	if common.iter().any(Option::is_some) {
		return common;
	}

	let Some(object) = p.as_object() else { return Vec::new() };

	object
		.iter()
		.filter_map(|(key, value)| dump_value(value).map(|value| format!("{key}: {value}")))
		.take(MAX_GENERIC_FIELDS)
		.map(Some)
		.collect()
}

fn dump_value(value: &Value) -> Option<String> {
	match value {
		Value::Bool(b) => Some(b.to_string()),
		_ => payload::as_text(value),
	}
}
