// test of the queue implementations
use oockit::queue::{BoundedQueue,Error,MemQueue,Queue};
use oockit::queue::blockfile::BlockFileQueue;

#[test]
fn mem_queue_is_fifo() {
    let mut q: MemQueue<i32> = MemQueue::new();
    q.open().unwrap();
    assert!(q.is_empty());
    q.enqueue(1).unwrap();
    q.enqueue(2).unwrap();
    assert_eq!(q.len(),2);
    assert_eq!(q.peek().unwrap(),&1);
    assert_eq!(q.dequeue().unwrap(),1);
    assert_eq!(q.dequeue().unwrap(),2);
    assert!(q.dequeue().is_err());
    q.close().unwrap();
}

#[test]
fn file_queue_round_trips_many_records() {
    let dir = tempfile::tempdir().expect("no temp dir");
    let mut q: BlockFileQueue<i64> = BlockFileQueue::create(&dir.path().join("q"),64,16,None).unwrap();
    q.open().unwrap();
    for i in 0..500i64 {
        q.enqueue(i * 3).unwrap();
    }
    assert_eq!(q.len(),500);
    for i in 0..500i64 {
        assert_eq!(q.peek().unwrap(),&(i * 3));
        assert_eq!(q.dequeue().unwrap(),i * 3);
    }
    assert!(q.is_empty());
    q.close().unwrap();
}

#[test]
fn file_queue_interleaves_reads_and_writes() {
    let dir = tempfile::tempdir().unwrap();
    let mut q: BlockFileQueue<i64> = BlockFileQueue::create(&dir.path().join("mix"),32,16,None).unwrap();
    q.open().unwrap();
    let mut expected = std::collections::VecDeque::new();
    let mut next = 0i64;
    for round in 0..50 {
        for _w in 0..round % 7 + 1 {
            q.enqueue(next).unwrap();
            expected.push_back(next);
            next += 1;
        }
        for _r in 0..round % 5 {
            if let Some(want) = expected.pop_front() {
                assert_eq!(q.dequeue().unwrap(),want);
            }
        }
    }
    while let Some(want) = expected.pop_front() {
        assert_eq!(q.dequeue().unwrap(),want);
    }
    assert!(q.is_empty());
    q.close().unwrap();
}

#[test]
fn file_queue_spills_records_wider_than_a_block() {
    let dir = tempfile::tempdir().unwrap();
    // 24-byte records, 16-byte blocks: every record spans block boundaries
    let mut q: BlockFileQueue<[u8;24]> = BlockFileQueue::create(&dir.path().join("wide"),16,64,None).unwrap();
    q.open().unwrap();
    for i in 0..40u8 {
        q.enqueue([i;24]).unwrap();
    }
    for i in 0..40u8 {
        assert_eq!(q.dequeue().unwrap(),[i;24]);
    }
    q.close().unwrap();
}

#[test]
fn backing_files_vanish_on_close() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("gone");
    let mut q: BlockFileQueue<i64> = BlockFileQueue::create(&prefix,32,4,None).unwrap();
    q.open().unwrap();
    for i in 0..100i64 {
        q.enqueue(i).unwrap();
    }
    assert!(prefix.exists());
    q.close().unwrap();
    assert!(!prefix.exists());
}

#[test]
fn bounded_queue_default_overflow_is_an_error() {
    let mut q = BoundedQueue::with_capacity(MemQueue::new(),2);
    q.open().unwrap();
    q.enqueue(1).unwrap();
    q.enqueue(2).unwrap();
    let e = q.enqueue(3).unwrap_err();
    assert!(matches!(e.downcast_ref::<Error>(),Some(Error::CapacityExceeded)));
    assert_eq!(q.len(),2);
    q.close().unwrap();
}

#[test]
fn bounded_queue_custom_handler_sheds_the_oldest() {
    let mut q = BoundedQueue::new(
        MemQueue::new(),
        Box::new(|len,_item: &i32| len < 3),
        Some(Box::new(|inner: &mut MemQueue<i32>,item| {
            inner.dequeue()?;
            inner.enqueue(item)
        }))
    );
    q.open().unwrap();
    for i in 0..5 {
        q.enqueue(i).unwrap();
    }
    assert_eq!(q.dequeue().unwrap(),2);
    assert_eq!(q.dequeue().unwrap(),3);
    assert_eq!(q.dequeue().unwrap(),4);
    q.close().unwrap();
}
