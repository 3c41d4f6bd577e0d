mod common;

use common::{MockTransport, connect, test_config};
use hana_bridge::prelude::*;
use pretty_assertions::assert_eq;

fn structure_columns() -> [&'static str; 6] {
    ["COLUMN_NAME", "DEFAULT_VALUE", "DATA_TYPE_NAME", "IS_NULLABLE", "LENGTH", "SCALE"]
}

fn users_structure(mock: &MockTransport) {
    mock.on(
        "FROM TABLE_COLUMNS WHERE SCHEMA_NAME='APP' AND TABLE_NAME='USERS' ORDER BY",
        &structure_columns(),
        vec![
            vec![
                "id".into(),
                Value::Null,
                "BIGINT".into(),
                "FALSE".into(),
                Value::Int(19),
                Value::Int(0),
            ],
            vec![
                "email".into(),
                Value::Null,
                "NVARCHAR".into(),
                "TRUE".into(),
                Value::Int(120),
                Value::Null,
            ],
        ],
    );
}

#[test]
fn test_create_table_creates_sequence_first() {
    let mock = MockTransport::new();
    mock.on_value("SELECT 1 FROM TABLE_COLUMNS", Value::Int(1));
    let mut conn = connect(&mock);

    conn.create_table(
        "users",
        &[ColumnSpec::new("email", LogicalType::String).limit(120).not_null()],
        &TableOptions::default(),
    )
    .unwrap();

    assert_eq!(
        mock.statements(),
        vec![
            "CREATE SEQUENCE \"USERS_seq\" INCREMENT BY 1 START WITH 1 NO CYCLE",
            concat!(
                "CREATE COLUMN TABLE \"USERS\" ",
                "(\"ID\" BIGINT NOT NULL PRIMARY KEY, \"EMAIL\" NVARCHAR(120) NOT NULL)"
            ),
            concat!(
                "SELECT 1 FROM TABLE_COLUMNS ",
                "WHERE SCHEMA_NAME='APP' AND TABLE_NAME='USERS' AND COLUMN_NAME='ID'"
            ),
            "ALTER SEQUENCE \"USERS_seq\" RESET BY SELECT IFNULL(MAX(\"ID\"),0)+1 FROM \"USERS\"",
        ]
    );
    mock.assert_balanced();
}

#[test]
fn test_create_table_honors_kind_and_configured_default() {
    let mock = MockTransport::new();
    let config = ConnectionConfig {
        default_table_type: TableKind::Row,
        ..test_config()
    };
    let mut conn = HanaConnection::new(mock.boxed(), config).unwrap();

    conn.create_table("events", &[], &TableOptions::default()).unwrap();
    let history = TableOptions::default().kind(TableKind::HistoryColumn).without_id();
    conn.create_table("audit", &[], &history).unwrap();

    let statements = mock.statements();
    let events = "CREATE ROW TABLE \"EVENTS\" (\"ID\" BIGINT NOT NULL PRIMARY KEY)";
    assert!(statements.contains(&events.to_string()));
    assert!(statements.contains(&"CREATE HISTORY COLUMN TABLE \"AUDIT\" ()".to_string()));
    // No key column reported, so no reset was issued.
    assert!(!statements.iter().any(|s| s.starts_with("ALTER SEQUENCE")));
}

#[test]
fn test_create_table_drops_sequence_when_create_fails() {
    let mock = MockTransport::new();
    mock.fail_on("CREATE COLUMN TABLE", "duplicate table name");
    let mut conn = connect(&mock);

    let err = conn.create_table("users", &[], &TableOptions::default()).unwrap_err();

    assert!(err.transport_message_contains("duplicate table name"));
    assert_eq!(mock.statements().last().unwrap(), "DROP SEQUENCE \"USERS_seq\"");
    mock.assert_balanced();
}

#[test]
fn test_create_table_translation_error_sends_nothing() {
    let mock = MockTransport::new();
    let mut conn = connect(&mock);

    let bad = ColumnSpec::new("n", LogicalType::Integer).limit(16);
    let err = conn.create_table("t", &[bad], &TableOptions::default()).unwrap_err();

    assert!(matches!(err, HanaError::Argument(_)));
    assert_eq!(mock.calls(), 0);
}

#[test]
fn test_force_drops_existing_table_and_sequence() {
    let mock = MockTransport::new();
    mock.on("FROM TABLES", &["NAME"], vec![vec!["users".into()]]);
    let mut conn = connect(&mock);

    conn.create_table("users", &[], &TableOptions::default().force()).unwrap();

    let statements = mock.statements();
    let drop_table = statements.iter().position(|s| s == "DROP TABLE \"USERS\"").unwrap();
    let drop_seq = statements.iter().position(|s| s == "DROP SEQUENCE \"USERS_seq\"").unwrap();
    let create_seq = statements.iter().position(|s| s.starts_with("CREATE SEQUENCE")).unwrap();
    assert!(drop_table < drop_seq && drop_seq < create_seq);
}

#[test]
fn test_drop_table_drops_sequence() {
    let mock = MockTransport::new();
    let mut conn = connect(&mock);

    conn.drop_table("users").unwrap();

    assert_eq!(mock.statements(), vec!["DROP TABLE \"USERS\"", "DROP SEQUENCE \"USERS_seq\""]);
}

#[test]
fn test_rename_table_continues_the_counter() {
    let mock = MockTransport::new();
    mock.on_value("NEXTVAL", Value::Int(42));
    let mut conn = connect(&mock);

    conn.rename_table("users", "members").unwrap();

    assert_eq!(
        mock.statements(),
        vec![
            "RENAME TABLE \"USERS\" TO \"MEMBERS\"",
            "SELECT \"USERS_seq\".NEXTVAL FROM DUMMY",
            concat!(
                "CREATE SEQUENCE \"MEMBERS_seq\" INCREMENT BY 1 START WITH 42 NO CYCLE ",
                "RESET BY SELECT IFNULL(MAX(\"ID\"),0)+1 FROM \"MEMBERS\""
            ),
            "DROP SEQUENCE \"USERS_seq\"",
        ]
    );
}

#[test]
fn test_rename_table_reverts_when_sequence_fails() {
    let mock = MockTransport::new();
    mock.on_value("NEXTVAL", Value::Int(42));
    mock.fail_on("CREATE SEQUENCE \"MEMBERS_seq\"", "insufficient privilege");
    let mut conn = connect(&mock);

    let err = conn.rename_table("users", "members").unwrap_err();

    assert!(matches!(err, HanaError::Transport(_)));
    assert_eq!(mock.statements().last().unwrap(), "RENAME TABLE \"MEMBERS\" TO \"USERS\"");
    assert!(!mock.statements().iter().any(|s| s.starts_with("DROP SEQUENCE")));
}

#[test]
fn test_table_structure_of_missing_table() {
    let mock = MockTransport::new();
    let mut conn = connect(&mock);

    let err = conn.table_structure("ghosts").unwrap_err();

    assert!(matches!(
        err,
        HanaError::StatementInvalid(ref m) if m == "Could not find table 'ghosts'"
    ));
    mock.assert_balanced();
}

#[test]
fn test_columns_are_memoized_until_cleared() {
    let mock = MockTransport::new();
    users_structure(&mock);
    let mut conn = connect(&mock);

    let columns = conn.columns("users").unwrap();
    assert_eq!(columns.len(), 2);
    assert_eq!(columns[0].name(), "id");
    assert!(!columns[0].null());
    assert_eq!(columns[1].logical_type(), Some(LogicalType::String));
    assert_eq!(columns[1].precision(), Some(120));

    conn.columns("USERS").unwrap();
    assert!(conn.columns_hash("Users").unwrap().contains_key("email"));
    assert_eq!(mock.calls(), 1);

    conn.clear_cache();
    conn.columns("users").unwrap();
    assert_eq!(mock.calls(), 2);
}

#[test]
fn test_column_for_unknown_column() {
    let mock = MockTransport::new();
    users_structure(&mock);
    let mut conn = connect(&mock);

    assert_eq!(conn.column_for("users", "EMAIL").unwrap().sql_type(), "NVARCHAR");
    assert!(matches!(conn.column_for("users", "age"), Err(HanaError::StatementInvalid(_))));
}

#[test]
fn test_change_column_default_keeps_length() {
    let mock = MockTransport::new();
    users_structure(&mock);
    let mut conn = connect(&mock);

    conn.change_column_default("users", "email", &Value::from("none")).unwrap();
    conn.change_column_null("users", "email", false).unwrap();

    let statements = mock.statements();
    let with_default = "ALTER TABLE \"USERS\" ALTER (\"EMAIL\" NVARCHAR(120) DEFAULT 'none')";
    let not_null = "ALTER TABLE \"USERS\" ALTER (\"EMAIL\" NVARCHAR(120) NOT NULL)";
    assert!(statements.contains(&with_default.to_string()));
    assert!(statements.contains(&not_null.to_string()));
}

#[test]
fn test_change_column_keeps_untouched_constraints() {
    let mock = MockTransport::new();
    mock.on(
        "FROM TABLE_COLUMNS WHERE SCHEMA_NAME='APP' AND TABLE_NAME='USERS' ORDER BY",
        &structure_columns(),
        vec![vec![
            "email".into(),
            "x".into(),
            "NVARCHAR".into(),
            "FALSE".into(),
            Value::Int(120),
            Value::Null,
        ]],
    );
    let mut conn = connect(&mock);

    conn.change_column_default("users", "email", &Value::from("none")).unwrap();
    conn.change_column_null("users", "email", true).unwrap();

    let altered: Vec<String> = mock
        .statements()
        .into_iter()
        .filter(|sql| sql.starts_with("ALTER TABLE"))
        .collect();
    assert_eq!(
        altered,
        vec![
            "ALTER TABLE \"USERS\" ALTER (\"EMAIL\" NVARCHAR(120) DEFAULT 'none' NOT NULL)",
            "ALTER TABLE \"USERS\" ALTER (\"EMAIL\" NVARCHAR(120) DEFAULT 'x')",
        ]
    );
}

#[test]
fn test_remove_primary_key_column() {
    let mock = MockTransport::new();
    mock.on_value("IS_PRIMARY_KEY", Value::from("id"));
    let mut conn = connect(&mock);

    conn.remove_column("users", "ID").unwrap();

    assert_eq!(
        mock.statements()[1..].to_vec(),
        vec!["ALTER TABLE \"USERS\" DROP PRIMARY KEY", "ALTER TABLE \"USERS\" DROP (\"ID\")"]
    );
}

#[test]
fn test_remove_plain_column() {
    let mock = MockTransport::new();
    mock.on_value("IS_PRIMARY_KEY", Value::from("id"));
    let mut conn = connect(&mock);

    conn.remove_column("users", "email").unwrap();

    assert_eq!(mock.statements()[1..].to_vec(), vec!["ALTER TABLE \"USERS\" DROP (\"EMAIL\")"]);
}

#[test]
fn test_indexes_uniqueness() {
    let mock = MockTransport::new();
    mock.on("FROM TABLES", &["NAME"], vec![vec!["users".into()]]);
    mock.on(
        "FROM INDEXES",
        &["TABLE_NAME", "INDEX_NAME", "CONSTRAINT"],
        vec![
            vec!["users".into(), "index_users_on_email".into(), "UNIQUE".into()],
            vec!["users".into(), "_sys_pk".into(), "primary key".into()],
            vec!["users".into(), "index_users_on_name".into(), Value::Null],
        ],
    );
    let mut conn = connect(&mock);

    let indexes = conn.indexes("users").unwrap();

    assert_eq!(
        indexes.iter().map(|i| (i.name.as_str(), i.unique)).collect::<Vec<_>>(),
        vec![("index_users_on_email", true), ("_sys_pk", true), ("index_users_on_name", false)]
    );
}

#[test]
fn test_indexes_of_missing_table_is_empty() {
    let mock = MockTransport::new();
    let mut conn = connect(&mock);

    assert!(conn.indexes("ghosts").unwrap().is_empty());
}

#[test]
fn test_add_and_rename_index() {
    let mock = MockTransport::new();
    let mut conn = connect(&mock);

    conn.add_index("users", &["email", "name"], true, None).unwrap();
    conn.rename_index("index_users_on_email_and_name", "users_email_name").unwrap();

    assert_eq!(
        mock.statements(),
        vec![
            concat!(
                "CREATE UNIQUE INDEX \"INDEX_USERS_ON_EMAIL_AND_NAME\" ",
                "ON \"USERS\" (\"EMAIL\", \"NAME\")"
            ),
            "RENAME INDEX \"INDEX_USERS_ON_EMAIL_AND_NAME\" TO \"USERS_EMAIL_NAME\"",
        ]
    );
}

#[test]
fn test_table_exists_checks_views() {
    let mock = MockTransport::new();
    mock.on("FROM VIEWS", &["NAME"], vec![vec!["active_users".into()]]);
    let mut conn = connect(&mock);

    assert!(conn.table_exists("app.active_users").unwrap());
    assert!(!conn.table_exists("orders").unwrap());
    assert!(!conn.table_exists("").unwrap());
}

#[test]
fn test_open_creates_missing_schema() {
    let mock = MockTransport::new();
    mock.on("FROM SCHEMAS", &["NAME"], vec![vec!["sys".into()]]);

    HanaConnection::open(mock.boxed(), test_config()).unwrap();

    assert_eq!(
        mock.statements()[1..].to_vec(),
        vec!["CREATE SCHEMA \"APP\"", "SET SCHEMA \"APP\""]
    );
}

#[test]
fn test_open_reuses_existing_schema() {
    let mock = MockTransport::new();
    mock.on("FROM SCHEMAS", &["NAME"], vec![vec!["app".into()]]);

    HanaConnection::open(mock.boxed(), test_config()).unwrap();

    assert_eq!(mock.statements()[1..].to_vec(), vec!["SET SCHEMA \"APP\""]);
}

#[test]
fn test_primary_key_of_missing_table_is_none() {
    let mock = MockTransport::new();
    let mut conn = connect(&mock);

    assert_eq!(conn.primary_key("ghosts").unwrap(), None);
}
