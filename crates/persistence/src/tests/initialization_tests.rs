// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Backend initialization tests.

use std::time::Duration;

use crate::{Persistence, PersistenceError};

#[test]
fn test_persistence_initialization() {
    let result: Result<Persistence, PersistenceError> = Persistence::new_in_memory();
    assert!(result.is_ok());
}

#[test]
fn test_foreign_key_enforcement_is_enabled() {
    let mut persistence = Persistence::new_in_memory().unwrap();
    assert!(persistence.verify_foreign_key_enforcement().is_ok());
}

#[test]
fn test_multiple_in_memory_instances_are_isolated() {
    let mut db1 = Persistence::new_in_memory().unwrap();
    let mut db2 = Persistence::new_in_memory().unwrap();

    db1.create_site("North", "UTC", None).unwrap();

    assert_eq!(db1.list_sites().unwrap().len(), 1);
    assert!(db2.list_sites().unwrap().is_empty(), "db2 should be isolated");
}

#[test]
fn test_busy_timeout_can_be_set() {
    let mut persistence = Persistence::new_in_memory().unwrap();
    assert!(persistence.set_busy_timeout(Duration::from_secs(5)).is_ok());
}

#[test]
fn test_file_database_is_initialized_with_wal() {
    let path = std::env::temp_dir().join(format!(
        "parkops_init_test_{}.sqlite",
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);

    {
        let mut persistence = Persistence::new_with_file(&path).unwrap();
        persistence.create_site("Harbor", "UTC", None).unwrap();
    }
    {
        let mut reopened = Persistence::new_with_file(&path).unwrap();
        let sites = reopened.list_sites().unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].name, "Harbor");
    }

    let _ = std::fs::remove_file(&path);
    let _ = std::fs::remove_file(path.with_extension("sqlite-wal"));
    let _ = std::fs::remove_file(path.with_extension("sqlite-shm"));
}
