use crate::task::ContactId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(alias = "ContactID", alias = "contactId", alias = "_id")]
    pub id: ContactId,
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(default, alias = "Company", alias = "empresa")]
    pub company: String,
    #[serde(default, alias = "Contact", alias = "email", alias = "Email")]
    pub contact: String,
    #[serde(default, alias = "Role", alias = "rol")]
    pub role: String,
}

/// The owner's contacts plus people who could be added.
#[derive(Debug, Default)]
pub struct ContactDirectory {
    contacts: Vec<Contact>,
    suggestions: Vec<Contact>,
    pub search: String,
    pub searching: bool,
    pub selected: usize,
    pub selected_suggestion: usize,
    pub loaded: bool,
}

impl ContactDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn load(&mut self, contacts: Vec<Contact>) {
        self.contacts = contacts;
        self.loaded = true;
        self.selected = self.selected.min(self.contacts.len().saturating_sub(1));
    }

    pub fn load_suggestions(&mut self, suggestions: Vec<Contact>) {
        self.suggestions = suggestions;
    }

    /// Suggestions whose name contains the query, minus existing contacts.
    pub fn filtered_suggestions(&self) -> Vec<&Contact> {
        let query = self.search.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        self.suggestions
            .iter()
            .filter(|s| s.name.to_lowercase().contains(&query))
            .filter(|s| !self.contains(&s.id))
            .collect()
    }

    pub fn contains(&self, id: &ContactId) -> bool {
        self.contacts.iter().any(|c| &c.id == id)
    }

    pub fn open_search(&mut self) {
        self.searching = true;
        self.search.clear();
        self.selected_suggestion = 0;
    }

    pub fn close_search(&mut self) {
        self.searching = false;
        self.search.clear();
        self.selected_suggestion = 0;
    }

    /// Adds the highlighted suggestion. Returns `false` if nothing matched.
    pub fn accept_suggestion(&mut self) -> bool {
        let picked = self
            .filtered_suggestions()
            .get(self.selected_suggestion)
            .map(|c| (*c).clone());
        let added = picked.is_some_and(|c| self.add(c));
        self.close_search();
        added
    }

    pub fn add(&mut self, contact: Contact) -> bool {
        if self.contains(&contact.id) {
            return false;
        }
        self.contacts.push(contact);
        true
    }

    pub fn remove(&mut self, id: &ContactId) -> Option<Contact> {
        let index = self.contacts.iter().position(|c| &c.id == id)?;
        let removed = self.contacts.remove(index);
        self.selected = self.selected.min(self.contacts.len().saturating_sub(1));
        Some(removed)
    }

    pub fn selected_contact(&self) -> Option<&Contact> {
        self.contacts.get(self.selected)
    }

    pub fn select(&mut self, delta: isize) {
        if self.searching {
            let count = self.filtered_suggestions().len();
            self.selected_suggestion = step(self.selected_suggestion, delta, count);
        } else {
            self.selected = step(self.selected, delta, self.contacts.len());
        }
    }
}

fn step(current: usize, delta: isize, count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    (current as isize + delta).clamp(0, count as isize - 1) as usize
}
