// test of the external merge sorter
use std::rc::Rc;
use oockit::cursor::Cursor;
use oockit::cursor::wrappers::IterCursor;
use oockit::queue::Queue;
use oockit::queue::blockfile::BlockFileQueue;
use oockit::sort::{MergeSorter,QueueFactory};

fn file_factory(dir: &tempfile::TempDir) -> QueueFactory<i64> {
    let root = dir.path().to_path_buf();
    let mut n = 0;
    Box::new(move || {
        n += 1;
        let q: BlockFileQueue<i64> = BlockFileQueue::create(&root.join(format!("run{}",n)),64,256,None)?;
        Ok(Box::new(q) as Box<dyn Queue<Item = i64>>)
    })
}

fn mem_factory() -> QueueFactory<i64> {
    Box::new(|| Ok(Box::new(oockit::queue::MemQueue::new()) as Box<dyn Queue<Item = i64>>))
}

#[test]
fn reverse_input_comes_out_sorted() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().expect("no temp dir");
    let cmp = Rc::new(|a: &i64,b: &i64| a.cmp(b));
    // runs of 1000 records, fan-in far above the run count
    let mut sorter = MergeSorter::new(cmp,8000,8,64,64,file_factory(&dir)).unwrap();
    let input = IterCursor::new((0..10000i64).rev());
    let mut sorted = sorter.sort(input).unwrap();
    assert!(sorter.runs_generated() >= 10);
    sorted.open().unwrap();
    for want in 0..10000i64 {
        assert!(sorted.has_next().unwrap());
        assert_eq!(sorted.next().unwrap(),want);
    }
    assert!(!sorted.has_next().unwrap());
    sorted.close().unwrap();
}

#[test]
fn recursive_merge_when_runs_exceed_fan_in() {
    let dir = tempfile::tempdir().unwrap();
    let cmp = Rc::new(|a: &i64,b: &i64| a.cmp(b));
    // runs of 8 records, fan-in 2: forces several merge rounds
    let mut sorter = MergeSorter::new(cmp,64,8,16,16,file_factory(&dir)).unwrap();
    let input = IterCursor::new((0..300i64).map(|x| (x * 7919) % 101));
    let sorted = sorter.sort(input).unwrap();
    let out = oockit::cursor::drain(sorted).unwrap();
    assert_eq!(out.len(),300);
    let mut resorted = out.clone();
    resorted.sort();
    assert_eq!(out,resorted);
}

#[test]
fn sorting_is_a_permutation() {
    let cmp = Rc::new(|a: &i64,b: &i64| a.cmp(b));
    let mut sorter = MergeSorter::new(cmp,32,8,8,8,mem_factory()).unwrap();
    let vals: Vec<i64> = (0..200).map(|x| (x * 31) % 17).collect();
    let sorted = sorter.sort(IterCursor::new(vals.clone().into_iter())).unwrap();
    let out = oockit::cursor::drain(sorted).unwrap();
    let mut expected = vals;
    expected.sort();
    assert_eq!(out,expected);
}

#[test]
fn equal_keys_keep_their_input_order() {
    // sort pairs by key only; the payload records the arrival order
    let cmp = Rc::new(|a: &[u8;2],b: &[u8;2]| a[0].cmp(&b[0]));
    let factory: oockit::sort::QueueFactory<[u8;2]> =
        Box::new(|| Ok(Box::new(oockit::queue::MemQueue::new()) as Box<dyn Queue<Item = [u8;2]>>));
    let mut sorter = MergeSorter::new(cmp,8,2,2,2,factory).unwrap();
    let input: Vec<[u8;2]> = (0..40u8).map(|i| [i % 3,i]).collect();
    let sorted = sorter.sort(IterCursor::new(input.into_iter())).unwrap();
    let out = oockit::cursor::drain(sorted).unwrap();
    for key in 0..3u8 {
        let seqs: Vec<u8> = out.iter().filter(|r| r[0] == key).map(|r| r[1]).collect();
        let mut expected = seqs.clone();
        expected.sort();
        assert_eq!(seqs,expected," for key {}",key);
    }
}

#[test]
fn empty_input_yields_empty_cursor() {
    let cmp = Rc::new(|a: &i64,b: &i64| a.cmp(b));
    let mut sorter = MergeSorter::new(cmp,32,8,8,8,mem_factory()).unwrap();
    let mut sorted = sorter.sort(IterCursor::new(std::iter::empty::<i64>())).unwrap();
    sorted.open().unwrap();
    assert!(!sorted.has_next().unwrap());
    sorted.close().unwrap();
}
