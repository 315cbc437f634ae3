//! In-memory host that records every call

use super::{DeviceHost, EntryKind, HostEntry};
use nix::errno::Errno;
use nix::mount::MsFlags;
use nix::sys::stat::{Mode, SFlag, makedev};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};

const MAX_HOPS: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Device(HostEntry),
    Symlink(PathBuf),
    Dir,
    File,
    Fifo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Stat(PathBuf),
    Lstat(PathBuf),
    ReadLink(PathBuf),
    Symlink(PathBuf),
    Mkdir(PathBuf),
    Mknod(PathBuf),
    Mount(PathBuf, MsFlags, Option<String>),
    Remount(PathBuf, MsFlags),
    Umask(u32),
}

#[derive(Debug)]
pub struct FakeHost {
    nodes: RefCell<BTreeMap<PathBuf, Node>>,
    calls: RefCell<Vec<Call>>,
    mask: Cell<u32>,
    pub mount_error: Option<Errno>,
    pub remount_error: Option<Errno>,
    pub mknod_error: Option<Errno>,
    pub lstat_error: Option<Errno>,
    pub read_link_error: Option<Errno>,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self {
            nodes: RefCell::new(BTreeMap::new()),
            calls: RefCell::new(Vec::new()),
            mask: Cell::new(0o022),
            mount_error: None,
            remount_error: None,
            mknod_error: None,
            lstat_error: None,
            read_link_error: None,
        }
    }
}

impl FakeHost {
    pub fn with_node(self, path: impl Into<PathBuf>, node: Node) -> Self {
        self.nodes.borrow_mut().insert(path.into(), node);
        self
    }

    pub fn with_dir(self, path: impl Into<PathBuf>) -> Self {
        self.with_node(path, Node::Dir)
    }

    pub fn with_char(self, path: impl Into<PathBuf>, perm: u32, major: u64, minor: u64) -> Self {
        self.with_device(path, libc::S_IFCHR, perm, major, minor)
    }

    pub fn with_block(self, path: impl Into<PathBuf>, perm: u32, major: u64, minor: u64) -> Self {
        self.with_device(path, libc::S_IFBLK, perm, major, minor)
    }

    fn with_device(
        self,
        path: impl Into<PathBuf>,
        fmt: libc::mode_t,
        perm: u32,
        major: u64,
        minor: u64,
    ) -> Self {
        let entry = HostEntry::from_raw(fmt | perm, makedev(major, minor));
        self.with_node(path, Node::Device(entry))
    }

    pub fn with_symlink(self, path: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        self.with_node(path, Node::Symlink(target.into()))
    }

    pub fn node(&self, path: impl AsRef<Path>) -> Option<Node> {
        self.nodes.borrow().get(path.as_ref()).cloned()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn mask(&self) -> u32 {
        self.mask.get()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }

    fn entry_of(node: &Node) -> HostEntry {
        match node {
            Node::Device(entry) => *entry,
            Node::Symlink(_) => HostEntry::from_raw(libc::S_IFLNK | 0o777, 0),
            Node::Dir => HostEntry::from_raw(libc::S_IFDIR | 0o755, 0),
            Node::File => HostEntry::from_raw(libc::S_IFREG | 0o644, 0),
            Node::Fifo => HostEntry::from_raw(libc::S_IFIFO | 0o600, 0),
        }
    }

    fn insert_new(&self, path: &Path, node: Node) -> Result<(), Errno> {
        let mut nodes = self.nodes.borrow_mut();
        if nodes.contains_key(path) {
            return Err(Errno::EEXIST);
        }
        let parent_is_dir = path
            .parent()
            .is_some_and(|p| matches!(nodes.get(p), Some(Node::Dir)));
        if !parent_is_dir {
            return Err(Errno::ENOENT);
        }
        nodes.insert(path.to_path_buf(), node);
        Ok(())
    }
}

impl DeviceHost for FakeHost {
    fn stat(&self, path: &Path) -> nix::Result<HostEntry> {
        self.record(Call::Stat(path.to_path_buf()));
        let nodes = self.nodes.borrow();
        let mut current = path.to_path_buf();
        for _ in 0..MAX_HOPS {
            match nodes.get(&current) {
                None => return Err(Errno::ENOENT),
                Some(Node::Symlink(target)) => {
                    current = match current.parent() {
                        Some(parent) if target.is_relative() => normalize(&parent.join(target)),
                        _ => normalize(target),
                    };
                }
                Some(node) => return Ok(Self::entry_of(node)),
            }
        }
        Err(Errno::ELOOP)
    }

    fn lstat(&self, path: &Path) -> nix::Result<HostEntry> {
        self.record(Call::Lstat(path.to_path_buf()));
        if let Some(errno) = self.lstat_error {
            return Err(errno);
        }
        self.nodes
            .borrow()
            .get(path)
            .map(Self::entry_of)
            .ok_or(Errno::ENOENT)
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        self.record(Call::ReadLink(path.to_path_buf()));
        if let Some(errno) = self.read_link_error {
            return Err(io::Error::from_raw_os_error(errno as i32));
        }
        match self.nodes.borrow().get(path) {
            Some(Node::Symlink(target)) => Ok(target.clone()),
            Some(_) => Err(io::Error::from_raw_os_error(libc::EINVAL)),
            None => Err(io::Error::from_raw_os_error(libc::ENOENT)),
        }
    }

    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        self.record(Call::Symlink(link.to_path_buf()));
        self.insert_new(link, Node::Symlink(target.to_path_buf()))
            .map_err(|e| io::Error::from_raw_os_error(e as i32))
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.record(Call::Mkdir(path.to_path_buf()));
        let mut nodes = self.nodes.borrow_mut();
        for dir in path.ancestors() {
            match nodes.get(dir) {
                Some(Node::Dir) => break,
                Some(_) => return Err(io::Error::from_raw_os_error(libc::ENOTDIR)),
                None => {
                    nodes.insert(dir.to_path_buf(), Node::Dir);
                }
            }
        }
        Ok(())
    }

    fn mknod(&self, path: &Path, kind: SFlag, perm: Mode, rdev: libc::dev_t) -> nix::Result<()> {
        self.record(Call::Mknod(path.to_path_buf()));
        if let Some(errno) = self.mknod_error {
            return Err(errno);
        }
        let entry = HostEntry::from_raw(kind.bits() | perm.bits(), rdev);
        debug_assert!(matches!(entry.kind, EntryKind::BlockDevice | EntryKind::CharDevice));
        self.insert_new(path, Node::Device(entry))
    }

    fn mount_tmpfs(&self, target: &Path, flags: MsFlags, data: Option<&str>) -> nix::Result<()> {
        self.record(Call::Mount(target.to_path_buf(), flags, data.map(str::to_owned)));
        self.mount_error.map_or(Ok(()), Err)
    }

    fn remount(&self, target: &Path, flags: MsFlags) -> nix::Result<()> {
        self.record(Call::Remount(target.to_path_buf(), flags));
        self.remount_error.map_or(Ok(()), Err)
    }

    fn umask(&self, mask: Mode) -> Mode {
        self.record(Call::Umask(mask.bits()));
        Mode::from_bits_truncate(self.mask.replace(mask.bits()))
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other),
        }
    }
    out
}
