use crate::{IoSpace, LcdError, LcdResult, Register};
use log::debug;
use memmap2::{MmapOptions, MmapRaw};
use std::fmt::{Debug, Formatter};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

/// Register space backed by a memory-mapped file.
///
/// The file is a byte image of the data space (the ATmega2560 layout uses the first `0x200`
/// bytes), so a simulator or bridge process mapping the same file sees every access.
///
/// Reads and writes are volatile. Read-modify-writes run under a lock, so two handles to the
/// same port in this process can't interleave and clobber each other's bits.
pub struct RawIoSpace {
    mmap: MmapRaw,
    lock: Mutex<()>,
}

impl RawIoSpace {
    /// Maps an existing register image.
    pub fn open(path: impl AsRef<Path>) -> LcdResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path.as_ref())?;

        if file.metadata()?.len() == 0 {
            return Err(LcdError::InvalidArgument);
        }

        let mmap = MmapOptions::new().map_raw(&file)?;
        debug!("Mapped {} bytes of {}", mmap.len(), path.as_ref().display());

        Ok(RawIoSpace {
            mmap,
            lock: Mutex::new(()),
        })
    }

    /// Maps the register image at `path`, creating it (or growing it) to at least `size` bytes.
    pub fn create(path: impl AsRef<Path>, size: usize) -> LcdResult<Self> {
        if size == 0 {
            return Err(LcdError::InvalidArgument);
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.as_ref())?;

        if file.metadata()?.len() < size as u64 {
            file.set_len(size as u64)?;
        }
        drop(file);

        Self::open(path)
    }

    fn read_byte(&self, address: u16) -> LcdResult<u8> {
        if address as usize >= self.mmap.len() {
            return Err(LcdError::InvalidArgument);
        }
        let ptr = self.mmap.as_ptr();
        let value = unsafe { ptr.add(address as usize).read_volatile() };
        Ok(value)
    }

    fn write_byte(&self, address: u16, value: u8) -> LcdResult<()> {
        if address as usize >= self.mmap.len() {
            return Err(LcdError::InvalidArgument);
        }
        let ptr = self.mmap.as_mut_ptr();
        unsafe { ptr.add(address as usize).write_volatile(value) };
        Ok(())
    }
}

impl Debug for RawIoSpace {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawIoSpace({:?}, {} bytes)", self.mmap.as_ptr().addr(), self.mmap.len())
    }
}

impl IoSpace for RawIoSpace {
    fn size(&self) -> usize {
        self.mmap.len()
    }

    fn get_register(&self, address: u16) -> LcdResult<Box<dyn Register + '_>> {
        if address as usize >= self.size() {
            return Err(LcdError::InvalidArgument);
        }
        Ok(Box::new(RawRegister {
            space: self,
            address,
        }))
    }
}

struct RawRegister<'a> {
    space: &'a RawIoSpace,
    address: u16,
}

impl Debug for RawRegister<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{:#05x}]", self.space, self.address)
    }
}

impl Register for RawRegister<'_> {
    fn read(&self) -> LcdResult<u8> {
        self.space.read_byte(self.address)
    }

    fn write(&self, value: u8) -> LcdResult<()> {
        self.space.write_byte(self.address, value)
    }

    fn modify(&self, mask: u8, bits: u8) -> LcdResult<()> {
        let _guard = self
            .space
            .lock
            .lock()
            .map_err(|_| LcdError::Other("register lock poisoned".to_string()))?;

        let value = self.space.read_byte(self.address)?;
        self.space.write_byte(self.address, (value & !mask) | (bits & mask))
    }
}
