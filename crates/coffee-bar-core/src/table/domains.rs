use super::{display_date, SortKey, TableColumn, TableRow};
use crate::models::DomainAllowlistEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainColumn {
    Domain,
    CreatedBy,
    CreatedAt,
}

impl TableColumn for DomainColumn {
    fn header(self) -> &'static str {
        match self {
            Self::Domain => "Domain",
            Self::CreatedBy => "Created By",
            Self::CreatedAt => "Created At",
        }
    }
}

impl DomainAllowlistEntry {
    /// Creator's name, falling back to their email, or `Unknown`.
    pub fn created_by_label(&self) -> String {
        match &self.created_by {
            Some(person) => {
                let name = person.display_name();
                if name.is_empty() {
                    person.email.clone()
                } else {
                    name
                }
            }
            None => "Unknown".to_owned(),
        }
    }
}

impl TableRow for DomainAllowlistEntry {
    type Column = DomainColumn;
    const COLUMNS: &'static [DomainColumn] = &[
        DomainColumn::Domain,
        DomainColumn::CreatedBy,
        DomainColumn::CreatedAt,
    ];

    fn filter_fields(&self) -> Vec<String> {
        let mut fields = vec![self.domain.clone()];
        if let Some(person) = &self.created_by {
            fields.push(person.email.clone());
            fields.push(person.display_name());
        }
        fields
    }

    fn sort_key(&self, column: DomainColumn) -> SortKey {
        match column {
            DomainColumn::Domain => SortKey::text(&self.domain),
            DomainColumn::CreatedBy => SortKey::text(&self.created_by_label()),
            DomainColumn::CreatedAt => SortKey::timestamp(Some(&self.created_at)),
        }
    }

    fn cell(&self, column: DomainColumn) -> String {
        match column {
            DomainColumn::Domain => self.domain.clone(),
            DomainColumn::CreatedBy => self.created_by_label(),
            DomainColumn::CreatedAt => display_date(&self.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PersonRef;
    use crate::table::{EntityTable, SortDirection};

    fn entry(id: &str, domain: &str, creator: Option<(&str, &str)>, created_at: &str) -> DomainAllowlistEntry {
        DomainAllowlistEntry {
            id: id.into(),
            domain: domain.to_owned(),
            created_at: created_at.to_owned(),
            updated_at: created_at.to_owned(),
            created_by: creator.map(|(name, email)| {
                let (given_name, surname) = name.split_once(' ').unwrap_or((name, ""));
                PersonRef {
                    id: "u1".into(),
                    email: email.to_owned(),
                    given_name: given_name.to_owned(),
                    surname: surname.to_owned(),
                }
            }),
        }
    }

    fn sample() -> EntityTable<DomainAllowlistEntry> {
        EntityTable::new(vec![
            entry("1", "example.com", Some(("Lovelace, Ada", "ada@example.com")), "2024-02-01T00:00:00Z"),
            entry("2", "acme.io", Some(("Grace Hopper", "grace@acme.io")), "2024-01-01T00:00:00Z"),
            entry("3", "zeta.dev", None, "2024-03-01T00:00:00Z"),
        ])
    }

    #[test]
    fn export_has_header_plus_one_line_per_row_and_quotes_commas() {
        let mut table = sample();
        table.sort_by(DomainColumn::CreatedAt, SortDirection::Ascending);

        let csv = table.export_csv().expect("non-empty view exports");
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "Domain,Created By,Created At");
        assert_eq!(lines[1], "acme.io,Grace Hopper,2024-01-01");
        assert_eq!(lines[2], "example.com,\"Lovelace, Ada\",2024-02-01");
        assert_eq!(lines[3], "zeta.dev,Unknown,2024-03-01");
    }

    #[test]
    fn filter_matches_creator_email_and_name() {
        let mut table = sample();
        table.set_filter("GRACE@");
        assert_eq!(table.view().len(), 1);

        table.set_filter("hopper");
        assert_eq!(table.view()[0].domain, "acme.io");
    }

    #[test]
    fn sort_by_domain_descending() {
        let mut table = sample();
        table.sort_by(DomainColumn::Domain, SortDirection::Descending);
        let domains: Vec<_> = table.view().iter().map(|row| row.domain.as_str()).collect();
        assert_eq!(domains, ["zeta.dev", "example.com", "acme.io"]);
    }
}
