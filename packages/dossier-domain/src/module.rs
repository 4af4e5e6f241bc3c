//! CRM module classification.

use serde_json::Value;

use crate::payload;

/// The CRM module a payload belongs to.
///
/// Most webhook senders tag their payloads; [`Module::classify`] covers the
/// ones that do not by sniffing characteristic fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Module {
	Leads,
	Contacts,
	Accounts,
	Deals,
	Notes,
	Tasks,
	Calls,
	Meetings,
	Projects,
	Emails,
	WorkDrive,
	Unknown,
}

impl Module {
	/// Parses a module tag as senders write it, any case, singular or
	/// plural. Unrecognized tags map to [`Module::Unknown`].
	pub fn parse(tag: &str) -> Self {
		match tag.trim().to_lowercase().as_str() {
			"lead" | "leads" => Self::Leads,
			"contact" | "contacts" => Self::Contacts,
			"account" | "accounts" => Self::Accounts,
			"deal" | "deals" | "potential" | "potentials" => Self::Deals,
			"note" | "notes" => Self::Notes,
			"task" | "tasks" => Self::Tasks,
			"call" | "calls" => Self::Calls,
			"meeting" | "meetings" | "event" | "events" => Self::Meetings,
			"project" | "projects" => Self::Projects,
			"email" | "emails" => Self::Emails,
			"workdrive" | "file" | "files" => Self::WorkDrive,
			_ => Self::Unknown,
		}
	}

	/// Sniffs the module from characteristic fields.
	///
	/// Order matters: a note attached to a deal still carries deal fields,
	/// so the more specific shapes are tested first.
	pub fn classify(payload: &Value) -> Self {
		const SHAPES: &[(Module, &[&str])] = &[
			(Module::Notes, &["Note_Title", "Note_Content"]),
			(Module::Deals, &["Deal_Name", "Stage"]),
			(Module::Projects, &["Project_Name", "Project_Id"]),
			(Module::Tasks, &["Task", "Due_Date"]),
			(Module::Calls, &["Call_Duration", "Call_Start_Time"]),
			(Module::WorkDrive, &["WorkDrive_Id", "File_Name", "Folder_Name"]),
			(Module::Leads, &["Lead_Name", "Lead_Status"]),
			(Module::Contacts, &["Contact_Name", "First_Name", "Last_Name"]),
			(Module::Accounts, &["Account_Name"]),
		];

		SHAPES
			.iter()
			.find(|(_, fields)| fields.iter().any(|field| payload::has_field(payload, field)))
			.map(|(module, _)| *module)
			.unwrap_or(Module::Unknown)
	}

	/// Resolves the module for a payload, trusting an explicit tag over
	/// sniffing.
	pub fn resolve(tag: Option<&str>, payload: &Value) -> Self {
		match tag.map(Self::parse) {
			Some(Self::Unknown) | None => Self::classify(payload),
			Some(module) => module,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Leads => "Leads",
			Self::Contacts => "Contacts",
			Self::Accounts => "Accounts",
			Self::Deals => "Deals",
			Self::Notes => "Notes",
			Self::Tasks => "Tasks",
			Self::Calls => "Calls",
			Self::Meetings => "Meetings",
			Self::Projects => "Projects",
			Self::Emails => "Emails",
			Self::WorkDrive => "WorkDrive",
			Self::Unknown => "Unknown",
		}
	}
}
