use super::wrappers::*;
use super::tee::tee;
use super::{Cursor,Error,drain};

fn is_capability_err(e: &crate::DYNERR) -> bool {
    matches!(e.downcast_ref::<Error>(),Some(Error::CapabilityMissing))
}

#[test]
fn empty_cursor() {
    let mut curs: EmptyCursor<i32> = EmptyCursor::new();
    curs.open().expect("open failed");
    assert_eq!(curs.has_next().unwrap(),false);
    assert!(curs.next().is_err());
    curs.close().expect("close failed");
    curs.close().expect("double close failed");
}

#[test]
fn single_cursor() {
    let mut curs = SingleCursor::new(42);
    curs.open().unwrap();
    assert_eq!(curs.peek().unwrap(),&42);
    assert_eq!(curs.next().unwrap(),42);
    assert_eq!(curs.has_next().unwrap(),false);
    curs.reset().unwrap();
    assert_eq!(curs.next().unwrap(),42);
    curs.close().unwrap();
}

#[test]
fn demand_before_open_fails() {
    let mut curs = SliceCursor::new(&[1,2,3]);
    assert!(curs.has_next().is_err());
    curs.open().unwrap();
    assert!(curs.has_next().unwrap());
    curs.close().unwrap();
    assert!(curs.next().is_err());
}

#[test]
fn peek_equals_next() {
    let mut curs = SliceCursor::new(&[10,20,30]);
    curs.open().unwrap();
    while curs.has_next().unwrap() {
        let ahead = *curs.peek().unwrap();
        assert_eq!(ahead,curs.next().unwrap());
    }
    curs.close().unwrap();
}

#[test]
fn has_next_does_not_advance() {
    let mut curs = SliceCursor::new(&[1,2]);
    curs.open().unwrap();
    for _rep in 0..5 {
        assert!(curs.has_next().unwrap());
    }
    assert_eq!(curs.next().unwrap(),1);
    curs.close().unwrap();
}

#[test]
fn slice_reset() {
    let mut curs = SliceCursor::new(&[1,2,3]);
    curs.open().unwrap();
    assert_eq!(curs.next().unwrap(),1);
    assert_eq!(curs.next().unwrap(),2);
    curs.reset().unwrap();
    assert_eq!(curs.next().unwrap(),1);
    curs.close().unwrap();
}

#[test]
fn vec_cursor_remove_and_update() {
    let mut curs = VecCursor::new(vec![1,2,3,4]);
    curs.open().unwrap();
    assert_eq!(curs.next().unwrap(),1);
    curs.remove().unwrap();
    assert_eq!(curs.next().unwrap(),2);
    curs.update(20).unwrap();
    assert_eq!(curs.next().unwrap(),3);
    curs.close().unwrap();
    assert_eq!(curs.into_inner(),vec![20,3,4]);
}

#[test]
fn vec_cursor_remove_without_next_fails() {
    let mut curs = VecCursor::new(vec![1]);
    curs.open().unwrap();
    let e = curs.remove().unwrap_err();
    assert!(matches!(e.downcast_ref::<Error>(),Some(Error::IterationState)));
    curs.close().unwrap();
}

#[test]
fn remove_after_peek_targets_peeked() {
    let mut curs = VecCursor::new(vec![1,2,3]);
    curs.open().unwrap();
    assert_eq!(curs.peek().unwrap(),&1);
    curs.remove().unwrap();
    assert_eq!(curs.next().unwrap(),2);
    curs.close().unwrap();
    assert_eq!(curs.into_inner(),vec![2,3]);
}

#[test]
fn capability_missing_is_loud() {
    let mut curs = IterCursor::new(0..3);
    curs.open().unwrap();
    assert!(!curs.supports_reset());
    assert!(is_capability_err(&curs.reset().unwrap_err()));
    assert!(is_capability_err(&curs.remove().unwrap_err()));
    curs.close().unwrap();
}

#[test]
fn iterator_adapter() {
    let curs = IterCursor::new((0..5).map(|x| x*x));
    assert_eq!(drain(curs).unwrap(),vec![0,1,4,9,16]);
}

#[test]
fn sequentializer_concatenates() {
    let parts: Vec<Box<dyn Cursor<Item = i32>>> = vec![
        Box::new(VecCursor::new(vec![1,2])),
        Box::new(EmptyCursor::new()),
        Box::new(VecCursor::new(vec![3])),
    ];
    let seq = Sequentializer::new(parts);
    assert_eq!(drain(seq).unwrap(),vec![1,2,3]);
}

#[test]
fn mapper_and_filter() {
    let curs = VecCursor::new(vec![1,2,3,4,5,6]);
    let evens = Filter::new(curs,|x| x % 2 == 0);
    let doubled = Mapper::new(evens,|x| x * 10);
    assert_eq!(drain(doubled).unwrap(),vec![20,40,60]);
}

#[test]
fn filter_keeps_reset_capability() {
    let mut filt = Filter::new(VecCursor::new(vec![1,2,3]),|x| *x > 1);
    assert!(filt.supports_reset());
    filt.open().unwrap();
    assert_eq!(filt.next().unwrap(),2);
    filt.reset().unwrap();
    assert_eq!(filt.next().unwrap(),2);
    filt.close().unwrap();
}

#[test]
fn tee_branches_advance_independently() {
    let source = VecCursor::new(vec![1,2,3,4]);
    let mut branches = tee(source,2);
    let mut b1 = branches.pop().unwrap();
    let mut b0 = branches.pop().unwrap();
    b0.open().unwrap();
    b1.open().unwrap();
    assert_eq!(b0.next().unwrap(),1);
    assert_eq!(b0.next().unwrap(),2);
    assert_eq!(b1.next().unwrap(),1);
    assert_eq!(b0.next().unwrap(),3);
    b0.close().unwrap();
    // closing one branch leaves the other alive
    assert_eq!(b1.next().unwrap(),2);
    assert_eq!(b1.next().unwrap(),3);
    assert_eq!(b1.next().unwrap(),4);
    assert_eq!(b1.has_next().unwrap(),false);
    b1.close().unwrap();
}
