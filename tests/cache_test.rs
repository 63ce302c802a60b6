// test of the buffered list storage
use oockit::store::cache::BufferedListFile;
use oockit::stats::MemStatCenter;

#[test]
fn third_list_forces_a_flush_and_everything_survives() {
    let dir = tempfile::tempdir().expect("no temp dir");
    let prefix = dir.path().join("buf");
    {
        let mut buf: BufferedListFile<i64> = BufferedListFile::create(&prefix,64,8,8,2,None).unwrap();
        buf.put_list(1,vec![100]).unwrap();
        buf.put_list(2,vec![200]).unwrap();
        buf.put_list(3,vec![300]).unwrap();
        buf.close().unwrap();
    }
    let mut back: BufferedListFile<i64> = BufferedListFile::open(&prefix,64,8,8,2,None).unwrap();
    assert_eq!(back.get_list(1).unwrap(),Some(vec![100]));
    assert_eq!(back.get_list(2).unwrap(),Some(vec![200]));
    assert_eq!(back.get_list(3).unwrap(),Some(vec![300]));
    back.close().unwrap();
}

#[test]
fn write_through_after_flush() {
    let dir = tempfile::tempdir().unwrap();
    let mut buf: BufferedListFile<i64> = BufferedListFile::create(&dir.path().join("wt"),64,8,8,4,None).unwrap();
    buf.put_list(1,vec![1,2,3]).unwrap();
    // served from memory before any flush
    assert_eq!(buf.get_list(1).unwrap(),Some(vec![1,2,3]));
    buf.flush().unwrap();
    assert_eq!(buf.get_list(1).unwrap(),Some(vec![1,2,3]));
    buf.close().unwrap();
}

#[test]
fn eviction_never_loses_a_write() {
    let dir = tempfile::tempdir().unwrap();
    let mut buf: BufferedListFile<i64> = BufferedListFile::create(&dir.path().join("evict"),64,8,8,3,None).unwrap();
    for id in 0..10i32 {
        buf.put_list(id,vec![id as i64 * 7]).unwrap();
    }
    for id in 0..10i32 {
        assert_eq!(buf.get_list(id).unwrap(),Some(vec![id as i64 * 7])," for list {}",id);
    }
    buf.close().unwrap();
}

#[test]
fn add_entry_with_uniqueness() {
    let dir = tempfile::tempdir().unwrap();
    let mut buf: BufferedListFile<i64> = BufferedListFile::create(&dir.path().join("uniq"),64,8,8,4,None).unwrap();
    buf.add_entry(1,5,false).unwrap();
    buf.add_entry(1,5,false).unwrap();
    buf.add_entry(1,5,true).unwrap();
    buf.add_entry(1,6,true).unwrap();
    assert_eq!(buf.get_list(1).unwrap(),Some(vec![5,5,6]));
    buf.close().unwrap();
}

#[test]
fn cached_reads_do_not_touch_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let center = MemStatCenter::new();
    let mut buf: BufferedListFile<i64> = BufferedListFile::create(&dir.path().join("hot"),64,8,8,4,Some(&center)).unwrap();
    buf.put_list(1,vec![1]).unwrap();
    buf.flush().unwrap();
    for _rep in 0..5 {
        assert_eq!(buf.get_list(1).unwrap(),Some(vec![1]));
    }
    // the list stayed cached through the flush, so it was never reloaded
    assert_eq!(center.value("hot_lists_loaded"),0);
    assert_eq!(center.value("hot_lists_stored"),1);
    buf.close().unwrap();
}

#[test]
fn remove_and_bookkeeping() {
    let dir = tempfile::tempdir().unwrap();
    let mut buf: BufferedListFile<i64> = BufferedListFile::create(&dir.path().join("rm"),64,8,8,2,None).unwrap();
    buf.put_list(1,vec![1]).unwrap();
    buf.put_list(2,vec![2,2]).unwrap();
    assert_eq!(buf.ids(),vec![1,2]);
    assert_eq!(buf.largest_id(),Some(2));
    assert_eq!(buf.get_list_size(2),Some(2));
    assert_eq!(buf.size_in_bytes().unwrap(),24);
    buf.remove(1).unwrap();
    assert!(!buf.contains(1));
    assert!(buf.remove(1).is_err());
    let all = buf.entry_set().unwrap();
    assert_eq!(all,vec![(2,vec![2,2])]);
    buf.close().unwrap();
}
