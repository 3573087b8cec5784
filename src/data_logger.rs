use crate::sequencer::{bassline, Voice};
use crate::session::Settings;
use crate::types::*;
use crossbeam_channel::Receiver;
use log::{error, info};
use serde_json::json;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Totals written to `stats.json` when the session ends.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LogStats {
    pub frames: u64,
    pub rollovers: u64,
    pub ornaments: u64,
}

/// Records a session: `manifest.json`, one NoteFrame per line in
/// `notes.jsonl`, and `stats.json` on close.
pub struct DataLogger {
    rx: Receiver<NoteFrame>,
    session_dir: PathBuf,
    settings: Settings,
}

impl DataLogger {
    pub fn new(rx: Receiver<NoteFrame>, output_dir: &Path, settings: Settings) -> io::Result<Self> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let session_dir = output_dir.join(format!("session_{}", timestamp));
        fs::create_dir_all(&session_dir)?;

        Ok(Self {
            rx,
            session_dir,
            settings,
        })
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    /// Run the logger. Blocks the calling thread until the frame channel closes.
    pub fn run(&self) -> io::Result<LogStats> {
        info!("Data logger → {:?}", self.session_dir);
        self.write_manifest()?;

        let notes_path = self.session_dir.join("notes.jsonl");
        let mut writer = BufWriter::new(File::create(&notes_path)?);
        let mut stats = LogStats::default();

        for frame in self.rx.iter() {
            let line = serde_json::to_string(&frame).map_err(io::Error::other)?;
            writeln!(writer, "{}", line)?;
            stats.frames += 1;
            if frame.rollover {
                stats.rollovers += 1;
            }
            if frame.ornament.is_some() {
                stats.ornaments += 1;
            }
            if stats.frames % 256 == 0 {
                writer.flush()?;
                info!("Logged {} notes", stats.frames);
            }
        }
        writer.flush()?;

        let stats_json = json!({
            "total_notes": stats.frames,
            "rollovers": stats.rollovers,
            "ornaments": stats.ornaments,
        });
        fs::write(
            self.session_dir.join("stats.json"),
            serde_json::to_string_pretty(&stats_json).map_err(io::Error::other)?,
        )
        .unwrap_or_else(|e| error!("Failed to write stats: {}", e));

        info!("Session saved: {} notes → {:?}", stats.frames, self.session_dir);
        Ok(stats)
    }

    fn write_manifest(&self) -> io::Result<()> {
        let manifest = json!({
            "version": env!("CARGO_PKG_VERSION"),
            "system": "tonetype",
            "settings": self.settings,
            "voices": {
                "melody": Voice::melody(),
                "bass": Voice::bass(),
            },
            "bassline": bassline().iter().map(|t| t.to_string()).collect::<Vec<_>>(),
        });
        let path = self.session_dir.join("manifest.json");
        fs::write(&path, serde_json::to_string_pretty(&manifest).map_err(io::Error::other)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn frame(note: &str, rollover: bool, ornament: bool) -> NoteFrame {
        NoteFrame {
            timestamp_us: 10,
            editor: EditorId(0),
            code: 7,
            note: note.into(),
            ornament: ornament.then(|| vec!["A4 s".into(), "G4 s".into()]),
            rollover,
            note_count: 1,
        }
    }

    #[test]
    fn test_session_files() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, rx) = unbounded();
        let logger = DataLogger::new(rx, dir.path(), Settings::default()).unwrap();

        tx.send(frame("G4 e", false, true)).unwrap();
        tx.send(frame("G4 e", true, false)).unwrap();
        drop(tx);

        let stats = logger.run().unwrap();
        assert_eq!(stats, LogStats { frames: 2, rollovers: 1, ornaments: 1 });

        let notes = fs::read_to_string(logger.session_dir().join("notes.jsonl")).unwrap();
        let parsed: Vec<NoteFrame> = notes
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(parsed, vec![frame("G4 e", false, true), frame("G4 e", true, false)]);

        let manifest: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(logger.session_dir().join("manifest.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(manifest["settings"]["tempo"], 120);
        assert_eq!(manifest["bassline"][6], "Bb2 q");

        let stats: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(logger.session_dir().join("stats.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(stats["total_notes"], 2);
    }
}
