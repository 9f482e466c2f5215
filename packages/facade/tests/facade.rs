use std::io::{Read, Write};
use std::num::NonZeroU64;
use std::sync::Arc;

use tierfs_core::options::{
    CreateDirectoryOptions, CreateFileOptions, ExistsOptions, GetStatusOptions, ListStatusOptions,
    OpenFileOptions, RenameOptions, SetAttributeOptions,
};
use tierfs_core::{
    fs_path, ClientError, DelegateStore, Error, FileStatus, MountContext, PathConf, PathDefaults,
    PositionReader, ReadType,
};
use tierfs_facade::{CacheAccessFacade, FallbackCounter};
use tierfs_memory::{InMemoryCacheClient, InMemoryStore};

const ROOT: &str = "s3://bucket/base";

struct Fixture {
    facade: CacheAccessFacade,
    cache: Arc<InMemoryCacheClient>,
    ufs: InMemoryStore,
    counter: FallbackCounter,
}

impl Fixture {
    fn new() -> Self {
        Self::with_context(MountContext::new(Some(fs_path!(ROOT))), PathConf::default())
    }

    fn with_context(context: MountContext, conf: PathConf) -> Self {
        let ufs = InMemoryStore::new();
        ufs.put_file("s3://bucket/base/data/a.txt", "hello world");
        ufs.put_file("s3://bucket/base/data/b.txt", "bee");
        ufs.put_dir("s3://bucket/base/data/sub");
        ufs.put_incomplete("s3://bucket/base/data/partial", "half");

        let cache = Arc::new(InMemoryCacheClient::new(
            ufs.clone(),
            tierfs_core::WorkerAddress::new("worker-7", 29999, 29997),
        ));
        let counter = FallbackCounter::new();
        let facade = CacheAccessFacade::new(
            context,
            cache.clone(),
            Arc::new(ufs.clone()),
            Arc::new(conf),
            counter.clone(),
        );
        Self {
            facade,
            cache,
            ufs,
            counter,
        }
    }
}

fn open_err(result: Result<Box<dyn tierfs_core::InStream>, Error>) -> Error {
    match result {
        Ok(_) => panic!("open unexpectedly succeeded"),
        Err(e) => e,
    }
}

fn read_all(mut stream: Box<dyn tierfs_core::InStream>) -> String {
    let mut out = String::new();
    stream.read_to_string(&mut out).unwrap();
    out
}

// getStatus

#[test]
fn get_status_served_by_cache() {
    let f = Fixture::new();
    let status = f
        .facade
        .get_status(&fs_path!("/data/a.txt"), &GetStatusOptions::default())
        .unwrap();
    assert_eq!(status.ufs_path, "s3://bucket/base/data/a.txt");
    assert_eq!(status.length, 11);
    assert_eq!(f.cache.calls().count("get_status"), 1);
    assert_eq!(f.ufs.calls().total(), 0);
    assert_eq!(f.counter.count(), 0);
}

#[test]
fn get_status_cache_not_found_is_terminal() {
    let f = Fixture::new();
    let err = f
        .facade
        .get_status(&fs_path!("/data/missing"), &GetStatusOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
    assert_eq!(f.ufs.calls().count("get_status"), 0);
    assert_eq!(f.counter.count(), 0);
}

#[test]
fn get_status_transport_error_falls_back_once() {
    let f = Fixture::new();
    f.cache.fail_with(ClientError::transport("connection refused"));

    let status = f
        .facade
        .get_status(&fs_path!("/data/a.txt"), &GetStatusOptions::default())
        .unwrap();
    assert_eq!(status.path, "s3://bucket/base/data/a.txt");
    assert_eq!(f.ufs.calls().count("get_status"), 1);
    assert_eq!(f.counter.count(), 1);
}

#[test]
fn get_status_fallback_failure_is_terminal() {
    let f = Fixture::new();
    f.cache.fail_with(ClientError::transport("connection refused"));

    let err = f
        .facade
        .get_status(&fs_path!("/data/missing"), &GetStatusOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::Delegate(ClientError::NotFound { .. })));
    assert!(err.is_not_found());
    assert_eq!(f.cache.calls().count("get_status"), 1);
    assert_eq!(f.ufs.calls().count("get_status"), 1);
    assert_eq!(f.counter.count(), 1);
}

#[test]
fn get_status_skips_cache_when_metadata_cache_disabled() {
    let f = Fixture::with_context(
        MountContext::new(Some(fs_path!(ROOT))).with_metadata_cache(false),
        PathConf::default(),
    );
    f.facade
        .get_status(&fs_path!("/data/a.txt"), &GetStatusOptions::default())
        .unwrap();
    assert_eq!(f.cache.calls().total(), 0);
    assert_eq!(f.ufs.calls().count("get_status"), 1);
    assert_eq!(f.counter.count(), 0);
}

#[test]
fn get_status_merges_path_defaults_under_caller_options() {
    let conf = PathConf::default().with_override(
        fs_path!("/data"),
        PathDefaults {
            get_status: GetStatusOptions {
                sync_interval_ms: Some(-1),
                update_timestamps: Some(true),
            },
            ..PathDefaults::default()
        },
    );
    let f = Fixture::with_context(MountContext::new(Some(fs_path!(ROOT))), conf);

    f.facade
        .get_status(
            &fs_path!("/data/a.txt"),
            &GetStatusOptions {
                sync_interval_ms: Some(0),
                update_timestamps: None,
            },
        )
        .unwrap();

    let seen = f.cache.last_status_options().unwrap();
    assert_eq!(seen.sync_interval_ms, Some(0));
    assert_eq!(seen.update_timestamps, Some(true));
}

#[test]
fn get_status_rejects_malformed_path() {
    let f = Fixture::new();
    let err = f
        .facade
        .get_status(&fs_path!("data/../a"), &GetStatusOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::InvalidPath(_)));
    assert_eq!(f.cache.calls().total(), 0);
    assert_eq!(f.ufs.calls().total(), 0);
}

#[test]
fn concurrent_failures_each_fall_back_once() {
    const CALLS: usize = 32;
    let f = Fixture::new();
    f.cache.fail_with(ClientError::transport("cluster down"));

    std::thread::scope(|s| {
        for _ in 0..CALLS {
            s.spawn(|| {
                f.facade
                    .get_status(&fs_path!("/data/a.txt"), &GetStatusOptions::default())
                    .unwrap();
            });
        }
    });

    assert_eq!(f.cache.calls().count("get_status"), CALLS);
    assert_eq!(f.ufs.calls().count("get_status"), CALLS);
    assert_eq!(f.counter.count(), CALLS as u64);
}

#[test]
fn recovery_returns_to_cache_immediately() {
    let f = Fixture::new();
    f.cache.fail_with(ClientError::transport("blip"));
    f.facade
        .get_status(&fs_path!("/data/a.txt"), &GetStatusOptions::default())
        .unwrap();
    f.cache.heal();
    f.facade
        .get_status(&fs_path!("/data/a.txt"), &GetStatusOptions::default())
        .unwrap();
    assert_eq!(f.cache.calls().count("get_status"), 2);
    assert_eq!(f.ufs.calls().count("get_status"), 1);
    assert_eq!(f.counter.count(), 1);
}

// openFile

#[test]
fn open_file_through_cache() {
    let f = Fixture::new();
    let stream = f
        .facade
        .open_file(&fs_path!("/data/a.txt"), &OpenFileOptions::default())
        .unwrap();
    assert_eq!(read_all(stream), "hello world");

    let spec = f.cache.last_block_spec().unwrap();
    assert_eq!(spec.ufs_path, "s3://bucket/base/data/a.txt");
    assert_eq!(spec.offset_in_file, 0);
    assert_eq!(spec.block_size, 11);
    assert_eq!(spec.mount_id, tierfs_core::PLACEHOLDER_MOUNT_ID);
    assert!(!spec.no_cache);
    assert_eq!(f.ufs.calls().count("open_file"), 0);
}

#[test]
fn open_file_block_spec_follows_merged_options() {
    let conf = PathConf::new(PathDefaults {
        open_file: OpenFileOptions {
            read_type: Some(ReadType::Cache),
            max_ufs_read_concurrency: Some(16),
        },
        ..PathDefaults::default()
    });
    let f = Fixture::with_context(MountContext::new(Some(fs_path!(ROOT))), conf);
    f.facade
        .open_file(
            &fs_path!("/data/a.txt"),
            &OpenFileOptions {
                read_type: Some(ReadType::NoCache),
                max_ufs_read_concurrency: None,
            },
        )
        .unwrap();

    let spec = f.cache.last_block_spec().unwrap();
    assert!(spec.no_cache);
    assert_eq!(spec.max_ufs_read_concurrency, 16);
}

#[test]
fn open_file_falls_back_on_stream_failure() {
    let f = Fixture::new();
    let status = f
        .facade
        .get_status(&fs_path!("/data/a.txt"), &GetStatusOptions::default())
        .unwrap();
    f.cache.fail_with(ClientError::transport("worker lost"));

    let stream = f
        .facade
        .open_file_status(&status, &OpenFileOptions::default())
        .unwrap();
    assert_eq!(read_all(stream), "hello world");
    assert_eq!(f.ufs.calls().count("open_file"), 1);
    assert_eq!(f.counter.count(), 1);
}

#[test]
fn open_directory_is_rejected_without_io() {
    for enabled in [true, false] {
        let f = Fixture::with_context(
            MountContext::new(Some(fs_path!(ROOT))).with_metadata_cache(enabled),
            PathConf::default(),
        );
        let dir = FileStatus::directory("/data/sub", "s3://bucket/base/data/sub");
        let err = open_err(f.facade.open_file_status(&dir, &OpenFileOptions::default()));
        assert!(matches!(err, Error::OpenDirectory { .. }));
        assert!(f
            .facade
            .open_position_read_status(&dir, &OpenFileOptions::default())
            .is_err());
        assert_eq!(f.cache.calls().count("open_stream"), 0);
        assert_eq!(f.cache.calls().count("open_position_reader"), 0);
        assert_eq!(f.ufs.calls().count("open_file"), 0);
        assert_eq!(f.ufs.calls().count("open_position_reader"), 0);
    }
}

#[test]
fn open_directory_by_path_is_rejected() {
    let f = Fixture::new();
    let err = open_err(
        f.facade
            .open_file(&fs_path!("/data/sub"), &OpenFileOptions::default()),
    );
    assert!(matches!(err, Error::OpenDirectory { .. }));
}

#[test]
fn open_incomplete_file_is_rejected() {
    let f = Fixture::new();
    let err = open_err(
        f.facade
            .open_file(&fs_path!("/data/partial"), &OpenFileOptions::default()),
    );
    assert!(matches!(err, Error::IncompleteFile { .. }));
    assert_eq!(f.cache.calls().count("open_stream"), 0);
    assert_eq!(f.counter.count(), 0);
}

// openPositionRead

#[test]
fn position_read_does_not_open_backing_store_when_cache_serves() {
    let f = Fixture::new();
    let reader = f
        .facade
        .open_position_read(&fs_path!("/data/a.txt"), &OpenFileOptions::default())
        .unwrap();
    let mut buf = [0u8; 5];
    assert_eq!(reader.read_at(6, &mut buf).unwrap(), 5);
    assert_eq!(&buf, b"world");
    assert!(!reader.fallback_opened());
    assert_eq!(f.ufs.calls().count("open_position_reader"), 0);
}

#[test]
fn position_read_opens_backing_store_once_on_read_failures() {
    let f = Fixture::new();
    let reader = f
        .facade
        .open_position_read(&fs_path!("/data/a.txt"), &OpenFileOptions::default())
        .unwrap();
    f.cache.fail_reads(true);

    let mut buf = [0u8; 5];
    for _ in 0..3 {
        assert_eq!(reader.read_at(0, &mut buf).unwrap(), 5);
        assert_eq!(&buf, b"hello");
    }
    assert!(reader.fallback_opened());
    assert_eq!(f.ufs.calls().count("open_position_reader"), 1);
    assert_eq!(f.counter.count(), 3);
}

#[test]
fn position_read_concurrent_fallback_opens_once() {
    let f = Fixture::new();
    let reader = f
        .facade
        .open_position_read(&fs_path!("/data/a.txt"), &OpenFileOptions::default())
        .unwrap();
    f.cache.fail_reads(true);

    std::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                let mut buf = [0u8; 11];
                assert_eq!(reader.read_at(0, &mut buf).unwrap(), 11);
            });
        }
    });
    assert_eq!(f.ufs.calls().count("open_position_reader"), 1);
}

#[test]
fn position_read_survives_cache_reader_creation_failure() {
    let f = Fixture::new();
    let status = f
        .facade
        .get_status(&fs_path!("/data/b.txt"), &GetStatusOptions::default())
        .unwrap();
    f.cache.fail_with(ClientError::transport("no workers"));

    let reader = f
        .facade
        .open_position_read_status(&status, &OpenFileOptions::default())
        .unwrap();
    assert_eq!(f.counter.count(), 1);
    assert!(!reader.fallback_opened());

    let mut buf = [0u8; 3];
    assert_eq!(reader.read_at(0, &mut buf).unwrap(), 3);
    assert_eq!(&buf, b"bee");
    assert_eq!(f.ufs.calls().count("open_position_reader"), 1);
}

// listStatus

#[test]
fn list_status_through_cache() {
    let f = Fixture::new();
    let mut names: Vec<String> = f
        .facade
        .list_status(&fs_path!("/data//"), &ListStatusOptions::default())
        .unwrap()
        .into_iter()
        .map(|s| s.path)
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "s3://bucket/base/data/a.txt",
            "s3://bucket/base/data/b.txt",
            "s3://bucket/base/data/partial",
            "s3://bucket/base/data/sub",
        ]
    );
    assert_eq!(f.ufs.calls().total(), 0);
}

#[test]
fn list_status_cache_not_found_is_empty() {
    let f = Fixture::new();
    let listing = f
        .facade
        .list_status(&fs_path!("/nowhere"), &ListStatusOptions::default())
        .unwrap();
    assert!(listing.is_empty());
    assert_eq!(f.ufs.calls().total(), 0);
    assert_eq!(f.counter.count(), 0);
}

#[test]
fn list_status_falls_back_on_transport_error() {
    let f = Fixture::new();
    f.cache.fail_with(ClientError::transport("timeout"));
    let listing = f
        .facade
        .list_status(&fs_path!("/data"), &ListStatusOptions::default())
        .unwrap();
    assert_eq!(listing.len(), 4);
    assert_eq!(f.ufs.calls().count("list_status"), 1);
    assert_eq!(f.counter.count(), 1);
}

// Mutations and pass-through reads

#[test]
fn mutations_bypass_cache() {
    let f = Fixture::new();

    let mut out = f
        .facade
        .create_file(&fs_path!("/data/new.txt"), &CreateFileOptions::default())
        .unwrap();
    out.write_all(b"fresh").unwrap();
    drop(out);
    assert_eq!(
        f.ufs.contents("s3://bucket/base/data/new.txt").unwrap(),
        bytes::Bytes::from("fresh")
    );

    f.facade
        .create_directory(
            &fs_path!("/logs"),
            &CreateDirectoryOptions::default(),
        )
        .unwrap();
    f.facade
        .rename(
            &fs_path!("/data/new.txt"),
            &fs_path!("/logs/new.txt"),
            &RenameOptions::default(),
        )
        .unwrap();
    f.facade
        .set_attribute(
            &fs_path!("/logs/new.txt"),
            &SetAttributeOptions {
                mode: Some(0o600),
                ..SetAttributeOptions::default()
            },
        )
        .unwrap();

    let moved = f
        .ufs
        .get_status(
            &fs_path!("s3://bucket/base/logs/new.txt"),
            &GetStatusOptions::default(),
        )
        .unwrap();
    assert_eq!(moved.mode, 0o600);
    assert_eq!(f.cache.calls().total(), 0);
    assert_eq!(f.counter.count(), 0);
}

#[test]
fn mutations_ignore_cache_faults() {
    let f = Fixture::new();
    f.cache.fail_with(ClientError::transport("down"));
    f.facade
        .create_directory(&fs_path!("/fine"), &CreateDirectoryOptions::default())
        .unwrap();
    assert_eq!(f.counter.count(), 0);
}

#[test]
fn mutation_errors_come_from_backing_store() {
    let f = Fixture::new();
    let err = f
        .facade
        .rename(
            &fs_path!("/data/none"),
            &fs_path!("/data/other"),
            &RenameOptions::default(),
        )
        .unwrap_err();
    assert!(matches!(err, Error::Delegate(ClientError::NotFound { .. })));
}

#[test]
fn exists_and_iterate_use_backing_store() {
    let f = Fixture::new();
    assert!(f
        .facade
        .exists(&fs_path!("/data/a.txt"), &ExistsOptions::default())
        .unwrap());
    assert!(!f
        .facade
        .exists(&fs_path!("/data/zzz"), &ExistsOptions::default())
        .unwrap());

    let mut count = 0;
    f.facade
        .iterate_status(
            &fs_path!("/data"),
            &ListStatusOptions::default(),
            &mut |_: &FileStatus| count += 1,
        )
        .unwrap();
    assert_eq!(count, 4);
    assert_eq!(f.cache.calls().total(), 0);
}

// Block locations

#[test]
fn block_locations_are_synthesized() {
    let context = MountContext::new(Some(fs_path!(ROOT)))
        .with_virtual_block_size(NonZeroU64::new(4).unwrap());
    let f = Fixture::with_context(context, PathConf::default());

    let blocks = f.facade.block_locations(&fs_path!("/data/a.txt")).unwrap();
    let lengths: Vec<u64> = blocks.iter().map(|b| b.length).collect();
    assert_eq!(lengths, vec![4, 4, 3]);
    for block in &blocks {
        assert_eq!(block.worker.host, "worker-7");
        assert_eq!(block.ufs_locations, vec!["s3://bucket/base/data/a.txt"]);
    }
}

#[test]
fn block_locations_ignore_metadata_cache_switch() {
    let f = Fixture::with_context(
        MountContext::new(Some(fs_path!(ROOT))).with_metadata_cache(false),
        PathConf::default(),
    );
    f.facade.block_locations(&fs_path!("/data/b.txt")).unwrap();
    assert_eq!(f.cache.calls().count("get_status"), 1);
    assert_eq!(f.ufs.calls().total(), 0);
}

#[test]
fn block_locations_never_fall_back() {
    let f = Fixture::new();
    f.cache.fail_with(ClientError::transport("down"));
    let err = f
        .facade
        .block_locations(&fs_path!("/data/a.txt"))
        .unwrap_err();
    assert!(matches!(err, Error::Cache(_)));
    assert_eq!(f.ufs.calls().total(), 0);
    assert_eq!(f.counter.count(), 0);
}

#[test]
fn block_locations_of_missing_file_is_not_found() {
    let f = Fixture::new();
    let err = f
        .facade
        .block_locations(&fs_path!("/data/missing"))
        .unwrap_err();
    assert!(matches!(err, Error::Cache(ClientError::NotFound { .. })));
    assert!(err.is_not_found());
    assert_eq!(f.ufs.calls().total(), 0);
}

#[test]
fn block_locations_for_status_translates_ufs_path() {
    let f = Fixture::new();
    let status = FileStatus::file("/data/b.txt", "/data/b.txt", 3);
    let blocks = f.facade.block_locations_for_status(&status).unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].ufs_locations, vec!["s3://bucket/base/data/b.txt"]);
}

#[test]
fn foreign_bucket_paths_are_not_served_from_root() {
    let f = Fixture::new();
    f.ufs.put_file("s3://other/data/a.txt", "OTHER BUCKET");

    let err = open_err(f.facade.open_file(
        &fs_path!("s3://other/data/a.txt"),
        &OpenFileOptions::default(),
    ));
    assert!(matches!(err, Error::InvalidPath(_)));
    assert!(matches!(
        f.facade
            .get_status(&fs_path!("gs://bucket/base/data/a.txt"), &GetStatusOptions::default()),
        Err(Error::InvalidPath(_))
    ));
    assert_eq!(f.cache.calls().total(), 0);
    assert_eq!(f.ufs.calls().total(), 0);
}

#[test]
fn open_defaults_are_keyed_by_backing_path() {
    let no_cache = PathDefaults {
        open_file: OpenFileOptions {
            read_type: Some(ReadType::NoCache),
            max_ufs_read_concurrency: None,
        },
        ..PathDefaults::default()
    };
    let conf = PathConf::default().with_override(fs_path!("s3://bucket/base/data"), no_cache);
    let f = Fixture::with_context(MountContext::new(Some(fs_path!(ROOT))), conf);

    f.facade
        .open_file(&fs_path!("/data/a.txt"), &OpenFileOptions::default())
        .unwrap();
    assert!(f.cache.last_block_spec().unwrap().no_cache);
}

#[test]
fn no_root_means_no_translation() {
    let ufs = InMemoryStore::new();
    ufs.put_file("/plain/file", "x");
    let cache = Arc::new(InMemoryCacheClient::new(
        ufs.clone(),
        tierfs_core::WorkerAddress::new("w", 1, 2),
    ));
    let facade = CacheAccessFacade::new(
        MountContext::default(),
        cache,
        Arc::new(ufs),
        Arc::new(PathConf::default()),
        FallbackCounter::new(),
    );
    let status = facade
        .get_status(&fs_path!("/plain/file"), &GetStatusOptions::default())
        .unwrap();
    assert_eq!(status.ufs_path, "/plain/file");
}
