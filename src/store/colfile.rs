//! ## Block column file
//!
//! A persistent array of fixed-size blocks split across a chain of physical
//! files.  Physical file `i` (1-based) is named `<prefix>` for `i == 1` and
//! `<prefix>.i` otherwise, and holds blocks `(i-1)*blocks_per_file + 1`
//! through `i*blocks_per_file`.  Block identifiers are 1-based; block 0 is
//! invalid.
//!
//! Every physical file except the last is kept at exactly
//! `blocks_per_file * block_size` bytes; the last covers the highest block
//! and is always an integer multiple of the block size.  Growth zero-fills,
//! so a block inside the sized region reads back as zeros until written,
//! and reopening recovers the block count from the file lengths.
//! Truncation via `set_size` deletes trailing physical files that no longer
//! hold any block and cuts the last retained file back the same way.
//!
//! At most one physical file handle is open at a time; jumping to a block in
//! a different physical file closes the old handle before opening the new.

use std::fs::{File,OpenOptions};
use std::io::{Read,Seek,SeekFrom,Write};
use std::path::{Path,PathBuf};
use log::{trace,debug,info};
use crate::stats::{Counter,StatCenter,maybe_count};
use crate::{STDRESULT,DYNERR};
use super::Error;

pub struct BlockColumnFile {
    prefix: PathBuf,
    block_size: usize,
    blocks_per_file: u64,
    num_blocks: u64,
    /// (1-based file number, handle)
    open_file: Option<(u64,File)>,
    reads: Counter,
    writes: Counter
}

impl BlockColumnFile {
    /// Start a new column file.  No physical file is created until the
    /// first block is written.
    pub fn create(prefix: &Path,block_size: usize,blocks_per_file: u64,center: Option<&dyn StatCenter>) -> Result<Self,DYNERR> {
        if block_size == 0 || blocks_per_file == 0 {
            return Err(Box::new(Error::InvalidParameter));
        }
        let stem = match prefix.file_name() {
            Some(s) => s.to_string_lossy().to_string(),
            None => return Err(Box::new(Error::InvalidParameter))
        };
        info!("create column file {} ({} byte blocks, {} per file)",prefix.display(),block_size,blocks_per_file);
        Ok(Self {
            prefix: prefix.to_path_buf(),
            block_size,
            blocks_per_file,
            num_blocks: 0,
            open_file: None,
            reads: maybe_count(center,&format!("{}_blocks_read",stem)),
            writes: maybe_count(center,&format!("{}_blocks_written",stem))
        })
    }
    /// Open an existing column file.  The geometry is supplied by the
    /// caller; the block count is derived from the physical file lengths.
    pub fn open(prefix: &Path,block_size: usize,blocks_per_file: u64,center: Option<&dyn StatCenter>) -> Result<Self,DYNERR> {
        let mut ans = Self::create(prefix,block_size,blocks_per_file,center)?;
        let mut fnum = 1;
        loop {
            let path = ans.file_path(fnum);
            match std::fs::metadata(&path) {
                Ok(meta) => {
                    let blocks_here = meta.len() / block_size as u64;
                    debug!("{} holds {} blocks",path.display(),blocks_here);
                    ans.num_blocks += blocks_here;
                    fnum += 1;
                },
                Err(_) => break
            }
        }
        Ok(ans)
    }
    pub fn block_size(&self) -> usize {
        self.block_size
    }
    /// Count of blocks currently addressable, i.e. the highest valid id.
    pub fn size(&self) -> u64 {
        self.num_blocks
    }
    fn file_path(&self,fnum: u64) -> PathBuf {
        match fnum {
            1 => self.prefix.clone(),
            _ => {
                let mut name = self.prefix.as_os_str().to_os_string();
                name.push(format!(".{}",fnum));
                PathBuf::from(name)
            }
        }
    }
    fn file_number(&self,block_id: u64) -> u64 {
        (block_id + self.blocks_per_file - 1) / self.blocks_per_file
    }
    fn offset(&self,block_id: u64) -> u64 {
        ((block_id - 1) % self.blocks_per_file) * self.block_size as u64
    }
    /// Switch the open handle to the physical file holding `block_id`.
    /// File sizing is `extend_to`'s business.
    fn handle(&mut self,block_id: u64,create: bool) -> Result<&mut File,DYNERR> {
        let fnum = self.file_number(block_id);
        let stale = match &self.open_file {
            Some((curr,_)) => *curr != fnum,
            None => true
        };
        if stale {
            self.open_file = None;
            let path = self.file_path(fnum);
            if !create && !path.exists() {
                return Err(Box::new(Error::DataNotFound));
            }
            debug!("switch to {}",path.display());
            let file = OpenOptions::new().read(true).write(true).create(create).open(&path)?;
            self.open_file = Some((fnum,file));
        }
        Ok(&mut self.open_file.as_mut().unwrap().1)
    }
    /// Read one block into `out`.  The buffer must hold at least one block.
    pub fn select(&mut self,block_id: u64,out: &mut [u8]) -> STDRESULT {
        if block_id == 0 {
            return Err(Box::new(Error::InvalidParameter));
        }
        if block_id > self.num_blocks {
            return Err(Box::new(Error::DataNotFound));
        }
        if out.len() < self.block_size {
            return Err(Box::new(Error::InvalidParameter));
        }
        trace!("select block {}",block_id);
        let off = self.offset(block_id);
        let block_size = self.block_size;
        let file = self.handle(block_id,false)?;
        file.seek(SeekFrom::Start(off))?;
        file.read_exact(&mut out[0..block_size])?;
        self.reads.inc();
        Ok(())
    }
    /// Write one block.  Writing past the current end extends the array
    /// with zero-filled blocks up to and including `block_id`.
    pub fn insert(&mut self,block_id: u64,dat: &[u8]) -> STDRESULT {
        if block_id == 0 || dat.len() < self.block_size {
            return Err(Box::new(Error::InvalidParameter));
        }
        trace!("insert block {}",block_id);
        if block_id > self.num_blocks {
            self.extend_to(block_id)?;
        }
        let off = self.offset(block_id);
        let block_size = self.block_size;
        let file = self.handle(block_id,true)?;
        file.seek(SeekFrom::Start(off))?;
        file.write_all(&dat[0..block_size])?;
        self.writes.inc();
        Ok(())
    }
    /// Make sure every physical file through the one holding `block_id`
    /// is sized for its blocks.  Growing a file zero-fills it.
    fn extend_to(&mut self,block_id: u64) -> STDRESULT {
        let last_fnum = self.file_number(block_id);
        let first_new = self.file_number(self.num_blocks.max(1));
        let full = self.blocks_per_file * self.block_size as u64;
        for fnum in first_new..=last_fnum {
            let path = self.file_path(fnum);
            // every file except the last is exactly full; the last covers
            // the highest block and stays a multiple of the block size
            let want = match fnum < last_fnum {
                true => full,
                false => self.offset(block_id) + self.block_size as u64
            };
            if !path.exists() {
                let file = File::create(&path)?;
                file.set_len(want)?;
            } else {
                let meta = std::fs::metadata(&path)?;
                if meta.len() < want {
                    OpenOptions::new().write(true).open(&path)?.set_len(want)?;
                }
            }
        }
        self.num_blocks = block_id;
        Ok(())
    }
    /// Grow with zero fill or truncate.  Truncation deletes trailing
    /// physical files that no longer hold any block.
    pub fn set_size(&mut self,n: u64) -> STDRESULT {
        debug!("resize {} -> {} blocks",self.num_blocks,n);
        if n >= self.num_blocks {
            if n > 0 {
                self.extend_to(n)?;
            }
            self.num_blocks = n;
            return Ok(());
        }
        // drop the handle before deleting or truncating underneath it
        self.open_file = None;
        let last_keep = self.file_number(n.max(1));
        let mut fnum = match n {
            0 => 1,
            _ => last_keep + 1
        };
        loop {
            let path = self.file_path(fnum);
            if !path.exists() {
                break;
            }
            info!("delete {}",path.display());
            std::fs::remove_file(&path)?;
            fnum += 1;
        }
        if n > 0 {
            let keep_blocks = (n - 1) % self.blocks_per_file + 1;
            let path = self.file_path(last_keep);
            OpenOptions::new().write(true).open(&path)?.set_len(keep_blocks * self.block_size as u64)?;
        }
        self.num_blocks = n;
        Ok(())
    }
    /// Release the currently open physical file.
    pub fn close(&mut self) -> STDRESULT {
        self.open_file = None;
        Ok(())
    }
    /// Close and delete every physical file.
    pub fn delete(mut self) -> STDRESULT {
        self.open_file = None;
        let mut fnum = 1;
        loop {
            let path = self.file_path(fnum);
            if !path.exists() {
                break;
            }
            info!("delete {}",path.display());
            std::fs::remove_file(&path)?;
            fnum += 1;
        }
        Ok(())
    }
}
