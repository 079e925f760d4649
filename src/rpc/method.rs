use std::fmt;

/// Every method the host answers on the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    TransferAddJob,
    TransferStartJob,
    TransferPauseJob,
    TransferResumeJob,
    TransferCancelJob,
    TransferClearCompleted,
    TransferGetAllJobs,
    TransferResolveConflict,
    FsList,
    FsStat,
    FsDelete,
    FsMkdir,
    FsRename,
    FsCopy,
    FsMove,
    FsChecksum,
    FsSearch,
    FsCreateSymlink,
    FsResolveSymlink,
    FsChmod,
    FsDrop,
}

impl Method {
    pub const ALL: [Method; 21] = [
        Method::TransferAddJob,
        Method::TransferStartJob,
        Method::TransferPauseJob,
        Method::TransferResumeJob,
        Method::TransferCancelJob,
        Method::TransferClearCompleted,
        Method::TransferGetAllJobs,
        Method::TransferResolveConflict,
        Method::FsList,
        Method::FsStat,
        Method::FsDelete,
        Method::FsMkdir,
        Method::FsRename,
        Method::FsCopy,
        Method::FsMove,
        Method::FsChecksum,
        Method::FsSearch,
        Method::FsCreateSymlink,
        Method::FsResolveSymlink,
        Method::FsChmod,
        Method::FsDrop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::TransferAddJob => "transfer.addJob",
            Method::TransferStartJob => "transfer.startJob",
            Method::TransferPauseJob => "transfer.pauseJob",
            Method::TransferResumeJob => "transfer.resumeJob",
            Method::TransferCancelJob => "transfer.cancelJob",
            Method::TransferClearCompleted => "transfer.clearCompleted",
            Method::TransferGetAllJobs => "transfer.getAllJobs",
            Method::TransferResolveConflict => "transfer.resolveConflict",
            Method::FsList => "fs.list",
            Method::FsStat => "fs.stat",
            Method::FsDelete => "fs.delete",
            Method::FsMkdir => "fs.mkdir",
            Method::FsRename => "fs.rename",
            Method::FsCopy => "fs.copy",
            Method::FsMove => "fs.move",
            Method::FsChecksum => "fs.checksum",
            Method::FsSearch => "fs.search",
            Method::FsCreateSymlink => "fs.createSymlink",
            Method::FsResolveSymlink => "fs.resolveSymlink",
            Method::FsChmod => "fs.chmod",
            Method::FsDrop => "fs.drop",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
