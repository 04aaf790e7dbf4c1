//! Integration tests for the heap file.
//!
//! These tests drive `HeapFile` through its public API over both storage
//! backends and check the record, tombstone, directory and scan properties
//! against a simple in-memory model.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures_util::TryStreamExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use slotstore::heap::{HeapError, HeapFile, RecordId, max_record_size, quantize};
use slotstore::storage::{FileStorage, MemoryStorage, PageId, Storage, StorageConfig};
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn scan_to_map<S: Storage>(heap: &HeapFile<S>) -> HashMap<RecordId, Vec<u8>> {
    let records: Vec<_> = heap
        .scan_all(CancellationToken::new())
        .try_collect()
        .await
        .unwrap();
    records
        .into_iter()
        .map(|(rid, bytes)| (rid, bytes.to_vec()))
        .collect()
}

async fn assert_directory_accurate<S: Storage>(heap: &HeapFile<S>) {
    for page_id in heap.free_space_directory().page_ids() {
        let actual = heap.page_free_bytes(page_id).await.unwrap();
        assert_eq!(
            heap.free_space_directory().get(page_id),
            Some(quantize(actual)),
            "directory out of date for page {}",
            page_id.page_num()
        );
    }
}

fn payload(rng: &mut StdRng, max: usize) -> Vec<u8> {
    let mut data = vec![0u8; rng.gen_range(0..=max)];
    rng.fill(&mut data[..]);
    data
}

#[tokio::test]
async fn test_hello_world_reuses_tombstone() {
    init_tracing();
    let heap = HeapFile::open(MemoryStorage::new()).await.unwrap();

    let hello = heap.write(b"hello").await.unwrap();
    assert_eq!(hello, RecordId::new(PageId::new(0), 0));

    heap.delete(hello).await.unwrap();
    assert!(matches!(
        heap.read(hello).await,
        Err(HeapError::RecordDeleted(rid)) if rid == hello
    ));

    let world = heap.write(b"world").await.unwrap();
    assert_eq!(world, RecordId::new(PageId::new(0), 0));
    assert_eq!(&heap.read(world).await.unwrap()[..], b"world");
}

#[tokio::test]
async fn test_randomized_workload_matches_model() {
    init_tracing();
    let heap = HeapFile::open(MemoryStorage::new()).await.unwrap();
    let mut rng = StdRng::seed_from_u64(0x5107);
    let mut model: HashMap<RecordId, Vec<u8>> = HashMap::new();

    for _ in 0..2_000 {
        let live: Vec<RecordId> = model.keys().copied().collect();
        let op = rng.gen_range(0..10);

        if live.is_empty() || op < 5 {
            let data = payload(&mut rng, 400);
            let rid = heap.write(&data).await.unwrap();
            assert!(model.insert(rid, data).is_none(), "live handle {rid} reused");
        } else if op < 7 {
            let rid = live[rng.gen_range(0..live.len())];
            heap.delete(rid).await.unwrap();
            model.remove(&rid);
            assert!(matches!(
                heap.read(rid).await,
                Err(HeapError::RecordDeleted(_))
            ));
        } else if op < 9 {
            let rid = live[rng.gen_range(0..live.len())];
            let old_len = model[&rid].len();
            let data = payload(&mut rng, 400);
            let new_rid = heap.update(rid, &data).await.unwrap();

            if data.len() <= old_len {
                assert_eq!(new_rid, rid);
            } else {
                assert_ne!(new_rid, rid);
                assert!(matches!(
                    heap.read(rid).await,
                    Err(HeapError::RecordDeleted(_))
                ));
            }
            model.remove(&rid);
            model.insert(new_rid, data);
        } else {
            let rid = live[rng.gen_range(0..live.len())];
            heap.compact_page(rid.page_id).await.unwrap();
            // A second pass has nothing left to reclaim
            assert_eq!(heap.compact_page(rid.page_id).await.unwrap(), 0);
        }
    }

    for (rid, data) in &model {
        assert_eq!(&heap.read(*rid).await.unwrap()[..], &data[..]);
    }
    assert_eq!(scan_to_map(&heap).await, model);
    assert_directory_accurate(&heap).await;
}

#[tokio::test]
async fn test_compaction_keeps_handles_and_contents() {
    let heap = HeapFile::open(MemoryStorage::new()).await.unwrap();
    let mut rids = Vec::new();
    for i in 0..20u8 {
        rids.push(heap.write(&vec![i; 100]).await.unwrap());
    }
    for rid in rids.iter().step_by(2) {
        heap.delete(*rid).await.unwrap();
    }

    let page_id = rids[1].page_id;
    let before = heap.page_free_bytes(page_id).await.unwrap();
    let reclaimed = heap.compact_page(page_id).await.unwrap();
    assert!(reclaimed > 0);
    assert_eq!(heap.page_free_bytes(page_id).await.unwrap(), before + reclaimed);

    for (i, rid) in rids.iter().enumerate().skip(1).step_by(2) {
        assert_eq!(&heap.read(*rid).await.unwrap()[..], &vec![i as u8; 100][..]);
    }
    assert_directory_accurate(&heap).await;
}

#[tokio::test]
async fn test_records_up_to_usable_capacity() {
    let config = StorageConfig::with_page_size(512);
    let heap = HeapFile::open(MemoryStorage::with_config(config).unwrap())
        .await
        .unwrap();
    let max = max_record_size(512);
    assert_eq!(heap.max_record_size(), max);

    let full = vec![0xAB; max];
    let rid = heap.write(&full).await.unwrap();
    assert_eq!(&heap.read(rid).await.unwrap()[..], &full[..]);
    assert_eq!(heap.page_free_bytes(rid.page_id).await.unwrap(), 0);

    assert!(matches!(
        heap.write(&vec![0; max + 1]).await,
        Err(HeapError::RecordTooLarge { size, max: limit }) if size == max + 1 && limit == max
    ));

    // The full page is skipped, the next record lands on a fresh one
    let next = heap.write(b"x").await.unwrap();
    assert_ne!(next.page_id, rid.page_id);
}

#[tokio::test]
async fn test_concurrent_writers() {
    init_tracing();
    let heap = Arc::new(HeapFile::open(MemoryStorage::new()).await.unwrap());

    let mut handles = Vec::new();
    for task in 0..8u32 {
        let heap = heap.clone();
        handles.push(tokio::spawn(async move {
            let mut written = Vec::new();
            for i in 0..60u32 {
                let data = format!("task {task} record {i} {}", "x".repeat((i % 7) as usize * 20));
                let rid = heap.write(data.as_bytes()).await.unwrap();
                written.push((rid, data.into_bytes()));
            }
            written
        }));
    }

    let mut expected = HashMap::new();
    for handle in handles {
        for (rid, data) in handle.await.unwrap() {
            assert!(expected.insert(rid, data).is_none(), "handle {rid} handed out twice");
        }
    }

    assert_eq!(expected.len(), 480);
    for (rid, data) in &expected {
        assert_eq!(&heap.read(*rid).await.unwrap()[..], &data[..]);
    }
    assert_eq!(scan_to_map(&heap).await, expected);
    assert_directory_accurate(&heap).await;
}

#[tokio::test]
async fn test_concurrent_mixed_operations() {
    let heap = Arc::new(HeapFile::open(MemoryStorage::new()).await.unwrap());
    let mut seeded = Vec::new();
    for i in 0..64u32 {
        seeded.push(heap.write(&i.to_le_bytes()).await.unwrap());
    }

    let deleter = {
        let heap = heap.clone();
        let victims: Vec<RecordId> = seeded.iter().copied().step_by(2).collect();
        tokio::spawn(async move {
            for rid in victims {
                heap.delete(rid).await.unwrap();
            }
        })
    };
    let writer = {
        let heap = heap.clone();
        tokio::spawn(async move {
            let mut rids = Vec::new();
            for i in 0..64u32 {
                rids.push(heap.write(&[i as u8; 48]).await.unwrap());
            }
            rids
        })
    };

    deleter.await.unwrap();
    let written = writer.await.unwrap();

    for rid in seeded.iter().skip(1).step_by(2) {
        assert_eq!(heap.read(*rid).await.unwrap().len(), 4);
    }
    let unique: HashSet<RecordId> = written.iter().copied().collect();
    assert_eq!(unique.len(), written.len());
    for (i, rid) in written.iter().enumerate() {
        assert_eq!(&heap.read(*rid).await.unwrap()[..], &[i as u8; 48][..]);
    }
    assert_eq!(scan_to_map(&heap).await.len(), 32 + 64);
}

#[tokio::test]
async fn test_file_reopen_rebuilds_directory() {
    init_tracing();
    let dir = tempdir().unwrap();
    let path = dir.path().join("heap.db");

    let mut survivors = HashMap::new();
    {
        let heap = HeapFile::open(FileStorage::open(&path).await.unwrap())
            .await
            .unwrap();
        for i in 0..100u32 {
            let data = vec![(i % 251) as u8; 150];
            let rid = heap.write(&data).await.unwrap();
            if i % 3 == 0 {
                heap.delete(rid).await.unwrap();
            } else {
                survivors.insert(rid, data);
            }
        }
        heap.close().await.unwrap();
    }

    let storage = FileStorage::open(&path).await.unwrap();
    let pages = storage.page_count().await;
    assert!(pages > 1);

    let heap = HeapFile::open(storage).await.unwrap();
    assert_eq!(heap.free_space_directory().len() as u64, pages);
    assert_directory_accurate(&heap).await;
    assert_eq!(scan_to_map(&heap).await, survivors);

    // Freed space is found again after the reopen
    let rid = heap.write(&[7u8; 150]).await.unwrap();
    assert!(rid.page_id.page_num() < pages);
}

#[tokio::test]
async fn test_scan_skips_released_pages() {
    let heap = HeapFile::open(MemoryStorage::new()).await.unwrap();
    let mut rids = Vec::new();
    for _ in 0..40 {
        rids.push(heap.write(&[1u8; 300]).await.unwrap());
    }
    let released = rids[0].page_id;
    assert!(heap.storage().release_page(released));

    let scanned = scan_to_map(&heap).await;
    let expected = rids.iter().filter(|rid| rid.page_id != released).count();
    assert_eq!(scanned.len(), expected);
    assert!(scanned.keys().all(|rid| rid.page_id != released));
}

#[tokio::test]
async fn test_scan_stops_when_cancelled() {
    let heap = HeapFile::open(MemoryStorage::new()).await.unwrap();
    for _ in 0..40 {
        heap.write(&[1u8; 300]).await.unwrap();
    }

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result: Result<Vec<_>, _> = heap.scan_all(cancel).try_collect().await;
    assert!(matches!(result, Err(HeapError::Cancelled)));
}
