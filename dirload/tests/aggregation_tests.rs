use async_trait::async_trait;
use dirload::{
    deep_merge_fn, default_loaders, json_loader, load_directory, percent_decode_names,
    Acceptance, ArrayLoader, DirectoryEntry, DirectoryListing, Fluent, LoadError, LoadOptions,
    MemoryStorage, ObjectLoader, Result, SharedLoader, SharedStorage, StorageBackend,
    StorageOptions, TextFileLoader, Value, ValueLoader, ValueLoaderExt, MAX_ARRAY_INDEX,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

fn memory_options(storage: &Arc<MemoryStorage>) -> LoadOptions {
    LoadOptions::new().with_storage(storage.clone())
}

/// Wraps a memory tree, counting listings and disposals.
#[derive(Debug)]
struct TrackingStorage {
    inner: MemoryStorage,
    listed: AtomicUsize,
    disposed: Arc<AtomicUsize>,
    nested: Option<SharedStorage>,
}

impl TrackingStorage {
    fn new(inner: MemoryStorage) -> Self {
        Self {
            inner,
            listed: AtomicUsize::new(0),
            disposed: Arc::new(AtomicUsize::new(0)),
            nested: None,
        }
    }

    fn with_nested(mut self, nested: SharedStorage) -> Self {
        self.nested = Some(nested);
        self
    }
}

#[async_trait]
impl StorageBackend for TrackingStorage {
    async fn read_text(&self, location: &Url, options: &StorageOptions) -> Result<String> {
        self.inner.read_text(location, options).await
    }

    async fn read_binary(&self, location: &Url, options: &StorageOptions) -> Result<Vec<u8>> {
        self.inner.read_binary(location, options).await
    }

    async fn list_directory(
        &self,
        location: &Url,
        options: &StorageOptions,
    ) -> Result<DirectoryListing> {
        let listing = self.inner.list_directory(location, options).await?;
        self.listed.fetch_add(1, Ordering::SeqCst);
        let disposed = self.disposed.clone();
        let listing = listing.with_disposer(move || {
            disposed.fetch_add(1, Ordering::SeqCst);
        });
        Ok(match &self.nested {
            Some(nested) => listing.with_nested_storage(nested.clone()),
            None => listing,
        })
    }
}

/// Accepts `.bak` files without storing them. Loading one is an error.
#[derive(Debug)]
struct IgnoreBackups;

#[async_trait]
impl ValueLoader for IgnoreBackups {
    fn name(&self) -> &str {
        "ignore-backups"
    }

    fn can_load_value<'a>(&'a self, entry: &'a DirectoryEntry) -> Acceptance<'a> {
        Acceptance::Ready(entry.is_file() && entry.name.ends_with(".bak"))
    }

    fn compute_key(&self, _entry: &DirectoryEntry) -> Option<String> {
        None
    }

    async fn load_value(&self, entry: &DirectoryEntry, _options: &LoadOptions) -> Result<Value> {
        Err(LoadError::invalid_location(entry.location.as_str()))
    }
}

#[tokio::test]
async fn test_end_to_end_text_and_json() {
    let storage = Arc::new(
        MemoryStorage::new()
            .with_file("app/name.txt", "demo")
            .with_file("app/server/port.json", "8080")
            .with_file("app/server/tls.json", r#"{"enabled": true}"#)
            .with_file("app/features.yaml", "- search\n- export\n")
            .with_file("app/limits.toml", "max = 10\n"),
    );

    let value = load_directory(storage.location("app"), &memory_options(&storage))
        .await
        .unwrap();

    assert_eq!(
        value.to_json(),
        json!({
            "features": ["search", "export"],
            "limits": {"max": 10},
            "name": "demo",
            "server": {"port": 8080, "tls": {"enabled": true}},
        })
    );
}

#[tokio::test]
async fn test_keys_in_numeric_aware_order() {
    let storage = Arc::new(
        MemoryStorage::new()
            .with_file("root/abc.txt", "w")
            .with_file("root/10.txt", "ten")
            .with_file("root/9.txt", "nine")
            .with_file("root/B.txt", "upper"),
    );

    let value = load_directory(storage.location("root"), &memory_options(&storage))
        .await
        .unwrap();
    let keys: Vec<&str> = value
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(keys, vec!["9", "10", "B", "abc"]);
}

#[tokio::test]
async fn test_strict_mode_fails_on_unhandled_entry() {
    let storage = Arc::new(
        MemoryStorage::new()
            .with_file("root/ok.json", "1")
            .with_file("root/sub/image.png", "\u{89}PNG"),
    );
    let options = memory_options(&storage).with_strict(true);

    let err = load_directory(storage.location("root"), &options)
        .await
        .unwrap_err();
    match err {
        LoadError::UnhandledEntry {
            relative_path,
            location,
        } => {
            assert_eq!(relative_path, "/sub/image.png");
            assert!(location.as_str().ends_with("/root/sub/image.png"));
        }
        other => panic!("expected UnhandledEntry, got {other:?}"),
    }
}

#[tokio::test]
async fn test_lenient_mode_skips_unhandled_entries() {
    let storage = Arc::new(
        MemoryStorage::new()
            .with_file("root/ok.json", "1")
            .with_file("root/image.png", "\u{89}PNG")
            .with_other("root/socket"),
    );

    let value = load_directory(storage.location("root"), &memory_options(&storage))
        .await
        .unwrap();
    assert_eq!(value.to_json(), json!({"ok": 1}));
}

#[tokio::test]
async fn test_same_key_overwrites_by_default() {
    let storage = Arc::new(
        MemoryStorage::new()
            .with_file("root/db.json", r#"{"host": "localhost", "pool": {"min": 1}}"#)
            .with_file("root/db.yaml", "port: 5432\npool:\n  max: 8\n"),
    );

    let value = load_directory(storage.location("root"), &memory_options(&storage))
        .await
        .unwrap();
    assert_eq!(
        value.to_json(),
        json!({"db": {"port": 5432, "pool": {"max": 8}}})
    );
}

#[tokio::test]
async fn test_same_key_deep_merges_when_configured() {
    let storage = Arc::new(
        MemoryStorage::new()
            .with_file("root/db.json", r#"{"host": "localhost", "pool": {"min": 1}}"#)
            .with_file("root/db.yaml", "port: 5432\npool:\n  max: 8\n"),
    );
    let options = LoadOptions {
        object_merge: Some(deep_merge_fn()),
        ..memory_options(&storage)
    };

    let value = load_directory(storage.location("root"), &options)
        .await
        .unwrap();
    assert_eq!(
        value.to_json(),
        json!({"db": {"host": "localhost", "port": 5432, "pool": {"min": 1, "max": 8}}})
    );
}

#[tokio::test]
async fn test_array_shape_is_sparse() {
    let storage = Arc::new(
        MemoryStorage::new()
            .with_file("list/99.txt", "last")
            .with_file("list/0.txt", "first")
            .with_file("list/42.txt", "middle"),
    );

    let value = ArrayLoader::new(default_loaders())
        .load_directory(storage.location("list"), &memory_options(&storage))
        .await
        .unwrap();
    let items = value.as_array().unwrap();
    assert_eq!(items.len(), 100);
    assert_eq!(items[0], Value::from("first"));
    assert_eq!(items[42], Value::from("middle"));
    assert_eq!(items[99], Value::from("last"));
    assert!(items[1].is_absent());
}

#[tokio::test]
async fn test_array_shape_rejects_huge_index() {
    let storage = Arc::new(
        MemoryStorage::new()
            .with_file("list/0.txt", "first")
            .with_file("list/9000000000000000000.txt", "x"),
    );

    let err = ArrayLoader::new(default_loaders())
        .load_directory(storage.location("list"), &memory_options(&storage))
        .await
        .unwrap_err();
    match err {
        LoadError::IndexOutOfRange { key, location, limit } => {
            assert_eq!(key, "9000000000000000000");
            assert!(location.as_str().ends_with("/list/9000000000000000000.txt"));
            assert_eq!(limit, MAX_ARRAY_INDEX);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_array_shape_accepts_largest_index() {
    let storage = Arc::new(MemoryStorage::new().with_file(
        &format!("list/{MAX_ARRAY_INDEX}.txt"),
        "last",
    ));

    let value = ArrayLoader::new(default_loaders())
        .load_directory(storage.location("list"), &memory_options(&storage))
        .await
        .unwrap();
    let items = value.as_array().unwrap();
    assert_eq!(items.len(), MAX_ARRAY_INDEX + 1);
    assert_eq!(items[MAX_ARRAY_INDEX], Value::from("last"));
}

#[tokio::test]
async fn test_array_shape_appends_non_numeric_keys() {
    let storage = Arc::new(
        MemoryStorage::new()
            .with_file("list/1.txt", "one")
            .with_file("list/extra.txt", "extra"),
    );

    let value = ArrayLoader::new(default_loaders())
        .load_directory(storage.location("list"), &memory_options(&storage))
        .await
        .unwrap();
    assert_eq!(value.to_json(), json!([null, "one", "extra"]));
}

#[tokio::test]
async fn test_none_key_is_accepted_but_not_stored() {
    let storage = Arc::new(
        MemoryStorage::new()
            .with_file("root/app.json", "{}")
            .with_file("root/app.json.bak", "{}"),
    );
    let mut loaders: Vec<SharedLoader> = vec![Arc::new(IgnoreBackups)];
    loaders.extend(default_loaders());

    // Strict mode does not complain: the backup is accepted
    let options = memory_options(&storage).with_strict(true);
    let value = ObjectLoader::new(loaders)
        .load_directory(storage.location("root"), &options)
        .await
        .unwrap();
    assert_eq!(value.to_json(), json!({"app": {}}));
}

#[tokio::test]
async fn test_pre_cancelled_load_does_no_io() {
    let storage = Arc::new(MemoryStorage::new().with_file("root/a.json", "1"));
    let token = CancellationToken::new();
    token.cancel();
    let options = memory_options(&storage).with_cancellation_token(token);

    let err = load_directory(storage.location("root"), &options)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(storage.operation_count(), 0);
}

#[tokio::test]
async fn test_cancelled_during_load_stops_before_next_entry() {
    let storage = Arc::new(
        MemoryStorage::new()
            .with_file("root/a.txt", "a")
            .with_file("root/b.txt", "b")
            .with_file("root/c.txt", "c"),
    );
    #[derive(Debug)]
    struct CancelAfterLoad {
        inner: SharedLoader,
        token: CancellationToken,
    }

    #[async_trait]
    impl ValueLoader for CancelAfterLoad {
        fn name(&self) -> &str {
            "cancel-after-load"
        }
        fn can_load_value<'a>(&'a self, entry: &'a DirectoryEntry) -> Acceptance<'a> {
            self.inner.can_load_value(entry)
        }
        fn compute_key(&self, entry: &DirectoryEntry) -> Option<String> {
            self.inner.compute_key(entry)
        }
        async fn load_value(&self, entry: &DirectoryEntry, options: &LoadOptions) -> Result<Value> {
            let value = self.inner.load_value(entry, options).await?;
            self.token.cancel();
            Ok(value)
        }
    }

    let token = CancellationToken::new();
    let loader: SharedLoader = Arc::new(CancelAfterLoad {
        inner: Arc::new(TextFileLoader::with_extension("txt")),
        token: token.clone(),
    });
    let options = memory_options(&storage).with_cancellation_token(token);
    let err = ObjectLoader::new(vec![loader])
        .load_directory(storage.location("root"), &options)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    // One listing and one read; b and c were never read
    assert_eq!(storage.operation_count(), 2);
}

#[tokio::test]
async fn test_disposer_runs_on_success() {
    let storage = Arc::new(TrackingStorage::new(
        MemoryStorage::new()
            .with_file("root/a.json", "1")
            .with_file("root/sub/b.json", "2")
            .with_file("root/sub/deeper/c.json", "3"),
    ));
    let location = storage.inner.location("root");

    let value = load_directory(location, &LoadOptions::new().with_storage(storage.clone()))
        .await
        .unwrap();
    assert_eq!(value.to_json(), json!({"a": 1, "sub": {"b": 2, "deeper": {"c": 3}}}));
    assert_eq!(storage.listed.load(Ordering::SeqCst), 3);
    assert_eq!(storage.disposed.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_disposer_runs_on_failure() {
    let storage = Arc::new(TrackingStorage::new(
        MemoryStorage::new()
            .with_file("root/a.json", "1")
            .with_file("root/sub/broken.json", "{oops"),
    ));
    let location = storage.inner.location("root");

    let err = load_directory(location, &LoadOptions::new().with_storage(storage.clone()))
        .await
        .unwrap_err();
    assert!(matches!(err, LoadError::Parse { .. }));
    assert_eq!(storage.listed.load(Ordering::SeqCst), 2);
    assert_eq!(storage.disposed.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_nested_storage_serves_children() {
    let mounted = Arc::new(
        MemoryStorage::new()
            .with_file("root/a.txt", "from mount")
            .with_file("root/sub/b.txt", "nested"),
    );
    let outer = Arc::new(
        TrackingStorage::new(
            MemoryStorage::new()
                .with_file("root/a.txt", "from outer")
                .with_file("root/sub/b.txt", "outer"),
        )
        .with_nested(mounted.clone()),
    );
    let location = outer.inner.location("root");

    let value = load_directory(location, &LoadOptions::new().with_storage(outer.clone()))
        .await
        .unwrap();
    assert_eq!(value.to_json(), json!({"a": "from mount", "sub": {"b": "nested"}}));
    // Only the root was listed through the outer storage
    assert_eq!(outer.listed.load(Ordering::SeqCst), 1);
    assert_eq!(mounted.operation_count(), 3);
}

#[tokio::test]
async fn test_embeds_locations() {
    let storage = Arc::new(
        MemoryStorage::new()
            .with_file("root/db.json", r#"{"host": "h"}"#)
            .with_file("root/name.txt", "n"),
    );
    let options = memory_options(&storage)
        .with_embed_directory_url_as("_dir")
        .with_embed_file_url_as("_file");

    let value = load_directory(storage.location("root"), &options)
        .await
        .unwrap();
    assert_eq!(value.get("_dir").and_then(Value::as_str), Some("memory:///root"));
    assert_eq!(
        value.get("db").and_then(|db| db.get("_file")).and_then(Value::as_str),
        Some("memory:///root/db.json")
    );
    assert_eq!(value.get("name").and_then(Value::as_str), Some("n"));
}

#[tokio::test]
async fn test_percent_decoded_names() {
    let storage = Arc::new(MemoryStorage::new().with_file("root/hello%20world.txt", "hi"));
    let options = LoadOptions {
        property_name_decoder: Some(percent_decode_names()),
        ..memory_options(&storage)
    };

    let value = load_directory(storage.location("root"), &options)
        .await
        .unwrap();
    assert_eq!(value.get("hello world").and_then(Value::as_str), Some("hi"));
}

#[tokio::test]
async fn test_fluent_loader_scopes_by_path() {
    let storage = Arc::new(
        MemoryStorage::new()
            .with_file("root/services/api.json", r#"{"port": 1}"#)
            .with_file("root/other/api.json", r#"{"port": 2}"#),
    );
    let services = json_loader()
        .fluent()
        .when_path_matches("/services/*.json")
        .unwrap()
        .map_key(|_, key| format!("svc-{key}"))
        .into_shared();
    let loaders = vec![services, Arc::new(json_loader()) as SharedLoader];

    let value = ObjectLoader::new(loaders)
        .load_directory(storage.location("root"), &memory_options(&storage))
        .await
        .unwrap();
    assert_eq!(
        value.to_json(),
        json!({"other": {"api": {"port": 2}}, "services": {"svc-api": {"port": 1}}})
    );
}

#[tokio::test]
async fn test_deferred_acceptance_binds_entries() {
    let storage = Arc::new(
        MemoryStorage::new()
            .with_file("root/feature_search.json", "true")
            .with_file("root/limits.json", r#"{"max": 3}"#),
    );
    let features = json_loader()
        .fluent()
        .when_deferred(|entry| {
            let feature = entry.name.starts_with("feature_");
            Box::pin(async move {
                tokio::task::yield_now().await;
                Ok(feature)
            })
        })
        .map_key(|_, key| key.trim_start_matches("feature_").to_uppercase())
        .into_shared();
    let loaders = vec![features, Arc::new(json_loader()) as SharedLoader];

    let value = ObjectLoader::new(loaders)
        .load_directory(storage.location("root"), &memory_options(&storage))
        .await
        .unwrap();
    assert_eq!(value.to_json(), json!({"SEARCH": true, "limits": {"max": 3}}));
}

#[tokio::test]
async fn test_deferred_acceptance_error_aborts_load() {
    let storage = Arc::new(
        MemoryStorage::new()
            .with_file("root/a.json", "1")
            .with_file("root/locked.json", "2")
            .with_file("root/z.json", "3"),
    );
    let guarded = json_loader()
        .fluent()
        .when_deferred(|entry| {
            let locked = entry.name == "locked.json";
            let location = entry.location.clone();
            Box::pin(async move {
                if locked {
                    Err(LoadError::parse(&location, "entry is locked"))
                } else {
                    Ok(true)
                }
            })
        })
        .into_shared();

    let err = ObjectLoader::new(vec![guarded])
        .load_directory(storage.location("root"), &memory_options(&storage))
        .await
        .unwrap_err();
    match err {
        LoadError::Parse { location, source } => {
            assert!(location.as_str().ends_with("/root/locked.json"));
            assert_eq!(source.to_string(), "entry is locked");
        }
        other => panic!("unexpected error: {other}"),
    }
    // Only the listing ran; no entry was read.
    assert_eq!(storage.operation_count(), 1);
}

#[tokio::test]
async fn test_missing_directory() {
    let storage = Arc::new(MemoryStorage::new());
    let err = load_directory(storage.location("nope"), &memory_options(&storage))
        .await
        .unwrap_err();
    assert!(matches!(err, LoadError::NotFound { .. }));
}
