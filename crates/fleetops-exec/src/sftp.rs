//! File upload over the SFTP subsystem

use std::path::Path;

use russh::client;
use russh_sftp::client::SftpSession;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::ExecError;

/// Upload `local` to `remote_path` and return the number of bytes written
///
/// When `remote_path` is an existing directory or ends in `/`, the file keeps
/// its local name inside it.
///
/// # Errors
/// `ExecError::LocalFileNotFound` if `local` is missing or not a regular file,
/// `ExecError::RemoteWriteFailed` for anything that goes wrong on the wire
pub(crate) async fn upload<H: client::Handler>(
    session: &client::Handle<H>,
    local: &Path,
    remote_path: &str,
) -> Result<u64, ExecError> {
    let not_found = || ExecError::LocalFileNotFound(local.display().to_string());

    let metadata = tokio::fs::metadata(local).await.map_err(|_| not_found())?;
    if !metadata.is_file() {
        return Err(not_found());
    }
    let file_name = local
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(not_found)?;
    let mut file = File::open(local).await.map_err(|_| not_found())?;

    let channel = session
        .channel_open_session()
        .await
        .map_err(write_failed)?;
    channel
        .request_subsystem(true, "sftp")
        .await
        .map_err(write_failed)?;
    let sftp = SftpSession::new(channel.into_stream())
        .await
        .map_err(sftp_failed)?;

    let is_dir = match sftp.metadata(remote_path).await {
        Ok(attrs) => attrs.is_dir(),
        Err(_) => false,
    };
    let target = remote_target(remote_path, file_name, is_dir);

    debug!(remote = %target, size = metadata.len(), "opening remote file");
    let mut remote = sftp.create(target.as_str()).await.map_err(sftp_failed)?;

    let written = copy_exact(&mut file, &mut remote, metadata.len()).await?;

    remote.shutdown().await.map_err(|e| {
        ExecError::RemoteWriteFailed(format!("closing {target}: {e}"))
    })?;
    sftp.close().await.map_err(sftp_failed)?;

    debug!(bytes = written, remote = %target, "upload complete");
    Ok(written)
}

/// Copy exactly `expected` bytes from `reader` to `writer`
///
/// Bytes past `expected` are left unread. Fewer bytes than `expected` means
/// the source changed underneath us and the upload is not trustworthy.
pub(crate) async fn copy_exact<R, W>(
    reader: &mut R,
    writer: &mut W,
    expected: u64,
) -> Result<u64, ExecError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let written = tokio::io::copy(&mut reader.take(expected), writer)
        .await
        .map_err(|e| ExecError::RemoteWriteFailed(e.to_string()))?;

    if written != expected {
        return Err(ExecError::RemoteWriteFailed(format!(
            "local file changed during upload: wrote {written} of {expected} bytes"
        )));
    }
    Ok(written)
}

/// Final remote path for an upload
fn remote_target(remote_path: &str, file_name: &str, is_dir: bool) -> String {
    if remote_path.is_empty() {
        file_name.to_string()
    } else if remote_path.ends_with('/') {
        format!("{remote_path}{file_name}")
    } else if is_dir {
        format!("{remote_path}/{file_name}")
    } else {
        remote_path.to_string()
    }
}

fn write_failed(err: russh::Error) -> ExecError {
    ExecError::RemoteWriteFailed(err.to_string())
}

fn sftp_failed(err: russh_sftp::client::error::Error) -> ExecError {
    ExecError::RemoteWriteFailed(err.to_string())
}
