#![allow(dead_code)]

use brine_kv::{Brine, KvError, LifecycleState};
use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::EnvFilter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub tags: Vec<String>,
}

pub fn profile(name: &str, tags: &[&str]) -> Profile {
    Profile {
        name: name.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn keys(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

/// Behaviour every backend must share. Starts by clearing the table so it
/// can run against long-lived server databases.
pub async fn conformance(uri: &str) {
    let brine: Brine<Profile> = Brine::new(uri);

    assert!(matches!(brine.get("a").await, Err(KvError::NotInitialized)));
    brine.init().await.unwrap();
    assert_eq!(brine.state(), LifecycleState::Connected);
    brine.clear().await.unwrap();

    // never written
    assert_eq!(brine.get("ghost").await.unwrap(), None);
    assert!(!brine.has("ghost").await.unwrap());

    // round trip and overwrite
    let ada = profile("ada", &["admin"]);
    assert_eq!(brine.set("hello", ada.clone()).await.unwrap(), ada);
    assert_eq!(brine.get("hello").await.unwrap(), Some(ada));
    assert_eq!(brine.count().await.unwrap(), 1);

    let bob = profile("bob", &[]);
    brine.set("hello", bob.clone()).await.unwrap();
    assert_eq!(brine.get("hello").await.unwrap(), Some(bob.clone()));
    assert_eq!(brine.count().await.unwrap(), 1);

    // batches
    brine
        .set_many(vec![
            ("key1".into(), profile("one", &["x"])),
            ("key2".into(), profile("two", &["y"])),
            ("key3".into(), profile("three", &["z"])),
        ])
        .await
        .unwrap();
    brine.delete("hello").await.unwrap();

    let mut listed = brine.keys().await.unwrap();
    listed.sort();
    assert_eq!(listed, keys(&["key1", "key2", "key3"]));

    let mut names: Vec<String> = brine
        .values()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["one", "three", "two"]);

    let found = brine
        .get_many(&keys(&["key1", "key3", "missing"]))
        .await
        .unwrap();
    assert_eq!(found.len(), 3);
    assert_eq!(found["key1"], Some(profile("one", &["x"])));
    assert_eq!(found["missing"], None);

    // deleting absent keys is not an error and leaves the rest alone
    brine
        .delete_many(&keys(&["key1", "missing"]))
        .await
        .unwrap();
    brine
        .delete_many(&keys(&["key1", "missing"]))
        .await
        .unwrap();
    brine.delete("missing").await.unwrap();
    assert_eq!(brine.count().await.unwrap(), 2);

    // ensure
    let kept = brine.ensure("key2", profile("other", &[])).await.unwrap();
    assert_eq!(kept, profile("two", &["y"]));
    let fresh = brine.ensure("key4", profile("four", &[])).await.unwrap();
    assert_eq!(fresh, profile("four", &[]));
    assert_eq!(brine.count().await.unwrap(), 3);

    brine.clear().await.unwrap();
    brine.clear().await.unwrap();
    assert_eq!(brine.count().await.unwrap(), 0);

    brine.close().await.unwrap();
    assert_eq!(brine.state(), LifecycleState::Closed);
    assert!(matches!(brine.get("a").await, Err(KvError::NotInitialized)));
    assert!(matches!(brine.count().await, Err(KvError::NotInitialized)));
}
