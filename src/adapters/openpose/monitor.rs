use std::collections::VecDeque;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::application::status_store::StatusStore;
use crate::domain::progress::infer_progress;

/// Líneas finales que se conservan de cada flujo.
pub const TAIL_LINES: usize = 20;

/// Lee un flujo del proceso línea a línea hasta EOF. Cada línea pasa a ser el
/// mensaje de estado y, si lleva un marcador conocido, mueve el progreso.
/// Devuelve las últimas `TAIL_LINES` líneas.
///
/// La salida de OpenPose es texto libre: se lee por bytes y lo que no sea
/// UTF-8 se sustituye, sin dejar nunca de vaciar la tubería.
pub fn spawn_monitor<R>(stream: R, status: StatusStore, name: &'static str) -> JoinHandle<Vec<String>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        let mut tail = VecDeque::with_capacity(TAIL_LINES);

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&buf);
                    let line = text.trim();
                    if line.is_empty() {
                        continue;
                    }
                    debug!(stream = name, "{line}");
                    status.record_line(line, infer_progress(line));

                    if tail.len() == TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line.to_string());
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                // Un error real de la tubería: no queda nada legible.
                Err(e) => {
                    warn!(stream = name, "stopped reading OpenPose output: {e}");
                    break;
                }
            }
        }
        tail.into_iter().collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[tokio::test]
    async fn lines_drive_message_and_progress() {
        let status = StatusStore::new();
        status.try_begin(Path::new("/in/a.png"), Path::new("/out")).unwrap();

        let output: &[u8] = b"Starting OpenPose demo...\nStarting processing\n  Rendering pose keypoints  \n\nOpenPose demo successfully Finished.\n";
        let tail = spawn_monitor(output, status.clone(), "stdout").await.unwrap();

        let snapshot = status.snapshot();
        assert_eq!(snapshot.message, "OpenPose demo successfully Finished.");
        assert_eq!(snapshot.progress, 75);
        assert_eq!(tail.len(), 4);
        assert_eq!(tail[2], "Rendering pose keypoints");
    }

    #[tokio::test]
    async fn tail_keeps_only_the_last_lines() {
        let status = StatusStore::new();
        let text: String = (0..50).map(|i| format!("line {i}\n")).collect();
        let tail = spawn_monitor(std::io::Cursor::new(text.into_bytes()), status.clone(), "stderr")
            .await
            .unwrap();

        assert_eq!(tail.len(), TAIL_LINES);
        assert_eq!(tail.first().map(String::as_str), Some("line 30"));
        assert_eq!(tail.last().map(String::as_str), Some("line 49"));
        // Sin trabajo activo el estado no cambia.
        assert_eq!(status.snapshot().message, "Idle");
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced_and_reading_continues() {
        let status = StatusStore::new();
        status.try_begin(Path::new("/in/a.png"), Path::new("/out")).unwrap();

        let output: &[u8] = b"Starting processing \xe9t\xe9\nRendering pose keypoints\nlast line without newline";
        let tail = spawn_monitor(output, status.clone(), "stdout").await.unwrap();

        assert_eq!(tail.len(), 3);
        assert_eq!(tail[0], "Starting processing \u{FFFD}t\u{FFFD}");
        assert_eq!(tail[2], "last line without newline");
        let snapshot = status.snapshot();
        assert_eq!(snapshot.message, "last line without newline");
        assert_eq!(snapshot.progress, 60);
    }
}
