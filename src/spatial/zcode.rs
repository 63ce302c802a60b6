//! ## Z-codes
//!
//! A Z-code is a variable-precision bit string naming a cell of the
//! recursive bisection of the unit cube.  Bit 0 splits dimension 0, bit 1
//! dimension 1, and so on round-robin; a code of precision `p` names the
//! cell reached after `p` splits, and every prefix names an enclosing cell.
//!
//! Two orderings matter and they are distinct:
//! * `prefix_cmp` compares the common-precision prefixes only, so a code
//!   and any of its prefixes compare `Equal`.  This is the join predicate's
//!   containment test.
//! * `Ord` is total: lexicographic on bits, with the shorter code first
//!   when one is a prefix of the other.  Inputs to the merge join must be
//!   sorted by this order so a containing cell arrives before its
//!   sub-cells.  Sorting by a byte comparator over the packed bits would
//!   misorder codes of differing precision.

use std::cmp::Ordering;
use std::fmt;
use bit_vec::BitVec;
use crate::store::Record;
use crate::spatial::{FixedRect,Point,Rect,FIXED_BITS,double_to_normalized_long_bits,normalized_long_bits_to_double};
use crate::DYNERR;

#[derive(Clone,PartialEq,Eq,Debug)]
pub struct ZCode {
    bits: BitVec
}

impl ZCode {
    /// The root cell, covering the whole unit cube.
    pub fn root() -> Self {
        Self { bits: BitVec::new() }
    }
    pub fn from_bits(bits: BitVec) -> Self {
        Self { bits }
    }
    /// Build from a slice of booleans, most significant first.
    pub fn from_bools(bools: &[bool]) -> Self {
        let mut bits = BitVec::with_capacity(bools.len());
        for b in bools {
            bits.push(*b);
        }
        Self { bits }
    }
    pub fn precision(&self) -> usize {
        self.bits.len()
    }
    pub fn bit(&self,i: usize) -> bool {
        self.bits.get(i).unwrap_or(false)
    }
    pub fn push(&mut self,bit: bool) {
        self.bits.push(bit);
    }
    /// The enclosing cell at precision `p` (a no-op when already coarser).
    pub fn truncated(&self,p: usize) -> ZCode {
        let mut bits = self.bits.clone();
        bits.truncate(p);
        Self { bits }
    }
    /// Compare the overlapping prefixes only; `Equal` means one cell
    /// contains the other.
    pub fn prefix_cmp(&self,other: &ZCode) -> Ordering {
        let common = self.precision().min(other.precision());
        for i in 0..common {
            match (self.bit(i),other.bit(i)) {
                (false,true) => return Ordering::Less,
                (true,false) => return Ordering::Greater,
                _ => {}
            }
        }
        Ordering::Equal
    }
    pub fn is_prefix_of(&self,other: &ZCode) -> bool {
        self.precision() <= other.precision() && self.prefix_cmp(other) == Ordering::Equal
    }
    /// Interleave fixed-point coordinates down to `precision` bits.
    pub fn from_fixed_point(coords: &[u64],precision: usize) -> ZCode {
        let d = coords.len();
        let mut bits = BitVec::with_capacity(precision);
        for level in 0..precision {
            let dim = level % d;
            let bit_index = (FIXED_BITS - 1) as usize - level / d;
            bits.push(coords[dim] >> bit_index & 1 == 1);
        }
        Self { bits }
    }
    /// The finest cell wholly containing the hypercube: interleave until
    /// the cube straddles a split plane or the depth cap is reached.
    pub fn from_fixed_rect(rect: &FixedRect) -> ZCode {
        let d = rect.dimensions();
        let mut ans = Self::root();
        let mut level = 0;
        while split_bit_index(d,level).is_some() {
            let dim = level % d;
            let bit_index = split_bit_index(d,level).unwrap();
            let lo = rect.lo[dim] >> bit_index & 1;
            let hi = rect.hi[dim] >> bit_index & 1;
            if lo != hi {
                break;
            }
            ans.push(lo == 1);
            level += 1;
        }
        ans
    }
}

/// Bit position of the split plane considered at `level`, None below the
/// reserved headroom `min_bit_index = 63 - 64/d`.
pub fn split_bit_index(d: usize,level: usize) -> Option<usize> {
    let min_bit_index = 63i64 - 64 / d as i64;
    let idx = (FIXED_BITS - 1) as i64 - (level / d) as i64;
    match idx > min_bit_index {
        true => Some(idx as usize),
        false => None
    }
}

impl Ord for ZCode {
    /// Total lexicographic order; a proper prefix sorts first.
    fn cmp(&self,other: &ZCode) -> Ordering {
        match self.prefix_cmp(other) {
            Ordering::Equal => self.precision().cmp(&other.precision()),
            ord => ord
        }
    }
}

impl PartialOrd for ZCode {
    fn partial_cmp(&self,other: &ZCode) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ZCode {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.precision() <= 16 {
            let s: String = self.bits.iter().map(|b| if b { '1' } else { '0' }).collect();
            write!(f,"z[{}]",s)
        } else {
            write!(f,"z[{}/{}]",hex::encode(self.bits.to_bytes()),self.precision())
        }
    }
}

/// A payload keyed for the Z-order merge: the data, the cell it was
/// assigned to, and whether it is a non-canonical replicate.
#[derive(Clone,Debug)]
pub struct ZKeyed<T> {
    pub data: T,
    pub code: ZCode,
    pub replicate: bool
}

impl<T> ZKeyed<T> {
    pub fn new(data: T,code: ZCode,replicate: bool) -> Self {
        Self { data, code, replicate }
    }
}

impl Record for ZKeyed<Rect> {
    fn to_bytes(&self) -> Vec<u8> {
        let d = self.data.dimensions();
        let mut ans = Vec::new();
        ans.extend(u16::to_be_bytes(d as u16));
        for i in 0..d {
            ans.extend(f64::to_be_bytes(self.data.ll().coord(i)));
        }
        for i in 0..d {
            ans.extend(f64::to_be_bytes(self.data.ur().coord(i)));
        }
        ans.push(self.replicate as u8);
        ans.extend(u16::to_be_bytes(self.code.precision() as u16));
        ans.extend(self.code.bits.to_bytes());
        ans
    }
    fn from_bytes(dat: &[u8]) -> Result<Self,DYNERR> {
        let err = || Box::new(crate::store::Error::Serialization);
        if dat.len() < 2 {
            return Err(err());
        }
        let d = u16::from_be_bytes(dat[0..2].try_into().unwrap()) as usize;
        let mut off = 2;
        let coords = |off: &mut usize| -> Result<Vec<f64>,DYNERR> {
            let mut ans = Vec::with_capacity(d);
            for _i in 0..d {
                let end = *off + 8;
                if dat.len() < end {
                    return Err(err());
                }
                ans.push(f64::from_be_bytes(dat[*off..end].try_into().unwrap()));
                *off = end;
            }
            Ok(ans)
        };
        let ll = coords(&mut off)?;
        let ur = coords(&mut off)?;
        if dat.len() < off + 3 {
            return Err(err());
        }
        let replicate = dat[off] != 0;
        let precision = u16::from_be_bytes(dat[off+1..off+3].try_into().unwrap()) as usize;
        off += 3;
        if dat.len() < off + (precision + 7) / 8 {
            return Err(err());
        }
        let mut bits = BitVec::from_bytes(&dat[off..off+(precision+7)/8]);
        bits.truncate(precision);
        let rect = Rect::new(Point::new(ll),Point::new(ur))?;
        Ok(ZKeyed::new(rect,ZCode::from_bits(bits),replicate))
    }
}

/// Map the fixed-point cell back to unit space, for diagnostics.
pub fn cell_origin(code: &ZCode,d: usize) -> Vec<f64> {
    let mut coords = vec![0u64;d];
    for level in 0..code.precision() {
        if code.bit(level) {
            let dim = level % d;
            let bit_index = (FIXED_BITS - 1) as usize - level / d;
            coords[dim] |= 1 << bit_index;
        }
    }
    coords.into_iter().map(normalized_long_bits_to_double).collect()
}

/// Z-code of a unit-space point at a given precision.
pub fn point_code(p: &Point,precision: usize) -> Result<ZCode,DYNERR> {
    let mut fixed = Vec::with_capacity(p.dimensions());
    for i in 0..p.dimensions() {
        let c = p.coord(i);
        let clamped = match c {
            c if c < 0.0 => 0,
            c if c >= 1.0 => (1u64 << FIXED_BITS) - 1,
            c => double_to_normalized_long_bits(c)?
        };
        fixed.push(clamped);
    }
    Ok(ZCode::from_fixed_point(&fixed,precision))
}
