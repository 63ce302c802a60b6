// test of the persistent list storage
use oockit::store::lists::ListFile;
use oockit::store::Error;
use oockit::cursor::Cursor;

#[test]
fn put_then_get_round_trip() {
    let dir = tempfile::tempdir().expect("no temp dir");
    let mut store: ListFile<i64> = ListFile::create(&dir.path().join("lists"),64,8,8,None).unwrap();
    store.put_list(1,&[10,20,30]).unwrap();
    store.put_list(2,&[]).unwrap();
    assert_eq!(store.get_list(1).unwrap(),Some(vec![10,20,30]));
    assert_eq!(store.get_list(2).unwrap(),Some(vec![]));
    assert_eq!(store.get_list(3).unwrap(),None);
    assert_eq!(store.get_list_size(1),Some(3));
    assert_eq!(store.ids(),vec![1,2]);
    assert_eq!(store.largest_id(),Some(2));
    assert!(store.contains(1) && !store.contains(9));
    store.close().unwrap();
}

#[test]
fn cursor_view_of_a_list() {
    let dir = tempfile::tempdir().unwrap();
    let mut store: ListFile<i64> = ListFile::create(&dir.path().join("curs"),64,8,8,None).unwrap();
    store.put_list(7,&[1,2,3]).unwrap();
    let mut curs = store.get_entries(7).unwrap().expect("list should exist");
    curs.open().unwrap();
    let mut seen = Vec::new();
    while curs.has_next().unwrap() {
        seen.push(curs.next().unwrap());
    }
    curs.close().unwrap();
    assert_eq!(seen,vec![1,2,3]);
    store.close().unwrap();
}

#[test]
fn replacement_reuses_the_extent_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let mut store: ListFile<i64> = ListFile::create(&dir.path().join("inplace"),64,8,8,None).unwrap();
    // one 64-byte block holds (64-24)/8 = 5 entries
    store.put_list(1,&[1,2,3,4,5]).unwrap();
    store.put_list(1,&[9,8]).unwrap();
    assert_eq!(store.get_list(1).unwrap(),Some(vec![9,8]));
    // growth beyond the extent allocates fresh blocks
    store.put_list(1,&[1,2,3,4,5,6,7]).unwrap();
    assert_eq!(store.get_list(1).unwrap(),Some(vec![1,2,3,4,5,6,7]));
    store.close().unwrap();
}

#[test]
fn appends_chain_extra_runs() {
    let dir = tempfile::tempdir().unwrap();
    let mut store: ListFile<i64> = ListFile::create(&dir.path().join("chain"),64,8,8,None).unwrap();
    let mut expected = Vec::new();
    for i in 0..23i64 {
        store.add_entry(4,&i).unwrap();
        expected.push(i);
    }
    assert_eq!(store.get_list(4).unwrap(),Some(expected));
    assert_eq!(store.get_list_size(4),Some(23));
    store.close().unwrap();
}

#[test]
fn removal_recycles_blocks() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("recycle");
    let mut store: ListFile<i64> = ListFile::create(&prefix,64,1,8,None).unwrap();
    store.put_list(1,&[1,2,3,4,5]).unwrap();
    store.remove(1).unwrap();
    assert!(!store.contains(1));
    assert!(store.get_list(1).unwrap().is_none());
    let e = store.remove(1).unwrap_err();
    assert!(matches!(e.downcast_ref::<Error>(),Some(Error::DataNotFound)));
    // the freed run serves the next allocation, so no second physical file
    // appears (one block per file here)
    store.put_list(2,&[6,7,8]).unwrap();
    assert_eq!(store.get_list(2).unwrap(),Some(vec![6,7,8]));
    store.close().unwrap();
    assert_eq!(std::fs::metadata(&prefix).unwrap().len(),64);
    let mut second = prefix.into_os_string();
    second.push(".2");
    assert!(!std::path::PathBuf::from(second).exists());
}

#[test]
fn wrong_record_width_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let mut store: ListFile<i64> = ListFile::create(&dir.path().join("width"),64,8,4,None).unwrap();
    let e = store.put_list(1,&[5i64]).unwrap_err();
    assert!(matches!(e.downcast_ref::<Error>(),Some(Error::Serialization)));
    store.close().unwrap();
}

#[test]
fn survives_close_and_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("persist");
    {
        let mut store: ListFile<i64> = ListFile::create(&prefix,64,8,8,None).unwrap();
        store.put_list(1,&[11,12]).unwrap();
        store.put_list(5,&[50]).unwrap();
        for i in 0..10i64 {
            store.add_entry(9,&i).unwrap();
        }
        store.close().unwrap();
    }
    let mut back: ListFile<i64> = ListFile::open(&prefix,64,8,8,None).unwrap();
    assert_eq!(back.get_list(1).unwrap(),Some(vec![11,12]));
    assert_eq!(back.get_list(5).unwrap(),Some(vec![50]));
    assert_eq!(back.get_list(9).unwrap(),Some((0..10).collect::<Vec<i64>>()));
    assert_eq!(back.ids(),vec![1,5,9]);
    // allocation continues past the recovered high-water mark
    back.put_list(2,&[99]).unwrap();
    assert_eq!(back.get_list(2).unwrap(),Some(vec![99]));
    assert_eq!(back.get_list(9).unwrap(),Some((0..10).collect::<Vec<i64>>()));
    back.close().unwrap();
}

#[test]
fn entry_set_materializes_everything() {
    let dir = tempfile::tempdir().unwrap();
    let mut store: ListFile<i64> = ListFile::create(&dir.path().join("all"),64,8,8,None).unwrap();
    store.put_list(3,&[3]).unwrap();
    store.put_list(1,&[1]).unwrap();
    let all = store.entry_set().unwrap();
    assert_eq!(all,vec![(1,vec![1]),(3,vec![3])]);
    store.close().unwrap();
}
