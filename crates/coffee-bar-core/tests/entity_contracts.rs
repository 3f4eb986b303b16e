use coffee_bar_core::{
    validation, CoreError, DomainAllowlistEntry, DomainColumn, EntityTable, FormField,
    PreferenceMap, RoleFilter, SortDirection, UserColumn, UserRecord, UserTable, WorkspaceRole,
};
use serde_json::json;

fn domains_payload() -> Vec<DomainAllowlistEntry> {
    serde_json::from_value(json!([
        {
            "id": "1",
            "domain": "example.com",
            "createdAt": "2024-05-01T12:00:00Z",
            "updatedAt": "2024-05-01T12:00:00Z",
            "createdBy": {"id": "9", "email": "ops@example.com", "givenName": "Ops", "surname": "Team, EU"}
        },
        {
            "id": "2",
            "domain": "sub.example.co.uk",
            "createdAt": "2023-11-20T08:30:00Z",
            "updatedAt": "2023-11-20T08:30:00Z",
            "createdBy": null
        },
        {
            "id": "3",
            "domain": "my-company.io",
            "createdAt": "2024-01-15T00:00:00Z",
            "updatedAt": "2024-01-15T00:00:00Z",
            "createdBy": {"id": "10", "email": "root@my-company.io", "givenName": "", "surname": ""}
        }
    ]))
    .expect("decode domain allowlist payload")
}

#[test]
fn domain_table_exports_the_sorted_view_with_quoted_commas() {
    let mut table = EntityTable::new(domains_payload());
    table.sort_by(DomainColumn::CreatedAt, SortDirection::Descending);

    let csv = table.export_csv().expect("three rows export");
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines,
        [
            "Domain,Created By,Created At",
            "example.com,\"Ops Team, EU\",2024-05-01",
            "my-company.io,root@my-company.io,2024-01-15",
            "sub.example.co.uk,Unknown,2023-11-20",
        ]
    );
}

#[test]
fn every_stored_domain_passes_the_hostname_grammar() {
    for entry in domains_payload() {
        assert_eq!(validation::validate_domain(&entry.domain), Ok(entry.domain.clone()));
    }
}

#[test]
fn users_payload_with_unknown_role_still_renders() {
    let users: Vec<UserRecord> = serde_json::from_value(json!([
        {"id": "1", "email": "a@acme.io", "givenName": "A", "surname": "One", "role": "billing", "isOnboarded": true},
        {"id": "2", "email": "b@acme.io", "givenName": "B", "surname": "Two", "role": "owner", "isOnboarded": true}
    ]))
    .expect("decode users payload");

    let mut table = UserTable::new(users);
    assert_eq!(
        table.table().rows()[0].effective_role(),
        WorkspaceRole::Unknown("billing".to_owned())
    );

    table.set_role_filter(RoleFilter::Role(WorkspaceRole::Owner));
    table
        .table_mut()
        .sort_by(UserColumn::Email, SortDirection::Ascending);
    let csv = table.export_csv().expect("one owner row");
    assert_eq!(csv.lines().count(), 2);
    assert!(csv.ends_with("b@acme.io,B,Two,owner,active,Never"));
}

#[test]
fn preference_edits_round_trip_through_the_blob() {
    let mut preferences = PreferenceMap::parse_blob(Some(r#"{"theme":"dark","beta":false}"#));
    preferences.add("limits", r#"{"seats": 25}"#).expect("new key");
    preferences.update("beta", "true").expect("existing key");

    let error: CoreError = preferences
        .add("theme", "light")
        .expect_err("duplicate key")
        .into();
    assert!(matches!(error, CoreError::Validation(ref field) if field.field == FormField::PreferenceKey));

    let reparsed = PreferenceMap::parse_blob(Some(&preferences.to_blob()));
    assert_eq!(reparsed, preferences);
    assert_eq!(reparsed.get("limits"), Some(&json!({"seats": 25})));
    assert_eq!(reparsed.get("beta"), Some(&json!(true)));
}
