//! Library scanner implementation

use std::path::{Path, PathBuf};

use bytes::BytesMut;
use globset::{Glob, GlobMatcher};
use rand::seq::SliceRandom;
use tokio::io::AsyncReadExt;

use super::error::LibraryError;
use crate::media::{probe_file, ChunkPacer};
use crate::relay::Relay;
use crate::views::TrackInfo;

/// Default chunk size written to the relay
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// Finds audio files and streams them into a relay
#[derive(Debug, Clone)]
pub struct Scanner {
    /// Library root, searched recursively
    pub dir: PathBuf,

    /// File name pattern
    pub glob: String,

    /// Bytes per relay write
    pub chunk_size: usize,

    /// Reshuffle the play order on every pass
    pub shuffle: bool,
}

impl Scanner {
    /// Scanner for `*.mp3` files under `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            glob: "*.mp3".to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            shuffle: false,
        }
    }

    /// Set the file name pattern
    pub fn glob(mut self, pattern: impl Into<String>) -> Self {
        self.glob = pattern.into();
        self
    }

    /// Set the chunk size; zero falls back to the default
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = if size == 0 { DEFAULT_CHUNK_SIZE } else { size };
        self
    }

    /// Enable or disable shuffling
    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    fn matcher(&self) -> Result<GlobMatcher, LibraryError> {
        Ok(Glob::new(&self.glob)?.compile_matcher())
    }

    /// All files below `dir` whose file name matches the pattern, sorted
    pub async fn find_all(&self) -> Result<Vec<PathBuf>, LibraryError> {
        let matcher = self.matcher()?;
        let mut files = Vec::new();
        let mut pending = vec![self.dir.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| LibraryError::io(&dir, e))?;

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| LibraryError::io(&dir, e))?
            {
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| LibraryError::io(&path, e))?;

                if file_type.is_dir() {
                    pending.push(path);
                } else if matcher.is_match(entry.file_name()) {
                    files.push(path);
                }
            }
        }

        files.sort();
        Ok(files)
    }

    /// Play the library into `relay` in an endless loop
    ///
    /// `on_next` is called with the track info right before a file starts.
    /// Files that vanished or carry no MPEG audio are skipped. Returns `Ok(())`
    /// if nothing matches the pattern, and an error once the relay is closed,
    /// on I/O failure, or when a whole pass had nothing playable.
    pub async fn stream<F>(&self, relay: &Relay, mut on_next: F) -> Result<(), LibraryError>
    where
        F: FnMut(&TrackInfo),
    {
        let mut files = self.find_all().await?;
        if files.is_empty() {
            tracing::warn!(dir = %self.dir.display(), glob = %self.glob, "No files to stream");
            return Ok(());
        }

        tracing::info!(
            dir = %self.dir.display(),
            files = files.len(),
            shuffle = self.shuffle,
            "Library scanned"
        );

        loop {
            if self.shuffle {
                files.shuffle(&mut rand::thread_rng());
            }

            let mut played = 0usize;
            for path in &files {
                match self.play(relay, path, &mut on_next).await {
                    Ok(()) => played += 1,
                    Err(e) if e.is_skippable() => {
                        tracing::warn!(error = %e, "Skipping file");
                    }
                    Err(e) => return Err(e),
                }
            }

            if played == 0 {
                return Err(LibraryError::NothingPlayable);
            }
        }
    }

    /// Stream one file into the relay at its bitrate
    async fn play<F>(&self, relay: &Relay, path: &Path, on_next: &mut F) -> Result<(), LibraryError>
    where
        F: FnMut(&TrackInfo),
    {
        let header = probe_file(path)
            .await
            .map_err(|source| LibraryError::Media {
                path: path.to_path_buf(),
                source,
            })?;

        let mut file = tokio::fs::File::open(path)
            .await
            .map_err(|e| LibraryError::io(path, e))?;
        let size = file
            .metadata()
            .await
            .map_err(|e| LibraryError::io(path, e))?
            .len();

        let track = TrackInfo::from_path(path, &header, size);
        tracing::info!(
            path = %path.display(),
            title = %track.title,
            bitrate = header.bitrate,
            "Now playing"
        );
        on_next(&track);

        let mut pacer = ChunkPacer::new(self.chunk_size, header.bitrate);

        loop {
            let mut chunk = BytesMut::with_capacity(self.chunk_size);
            while chunk.len() < self.chunk_size {
                let n = file
                    .read_buf(&mut chunk)
                    .await
                    .map_err(|e| LibraryError::io(path, e))?;
                if n == 0 {
                    break;
                }
            }

            if chunk.is_empty() {
                return Ok(());
            }

            pacer.wait().await;
            relay.write_bytes(chunk.freeze())?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::mp3::tests::mp3_frames;

    fn touch(path: &Path, data: &[u8]) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, data).unwrap();
    }

    #[tokio::test]
    async fn test_find_all_matches_recursively() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("foo.mp3"), b"foo");
        touch(&dir.path().join("sub/bar.mp3"), b"bar");
        touch(&dir.path().join("baz.txt"), b"baz");

        let files = Scanner::new(dir.path()).find_all().await.unwrap();

        assert_eq!(
            files,
            vec![dir.path().join("foo.mp3"), dir.path().join("sub/bar.mp3")]
        );
    }

    #[tokio::test]
    async fn test_find_all_custom_glob() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("foo.mp3"), b"foo");
        touch(&dir.path().join("baz.txt"), b"baz");

        let files = Scanner::new(dir.path()).glob("*.txt").find_all().await.unwrap();
        assert_eq!(files, vec![dir.path().join("baz.txt")]);
    }

    #[tokio::test]
    async fn test_invalid_glob() {
        let dir = tempfile::tempdir().unwrap();
        let err = Scanner::new(dir.path()).glob("[").find_all().await.unwrap_err();

        assert!(matches!(err, LibraryError::InvalidGlob(_)));
    }

    #[tokio::test]
    async fn test_missing_dir() {
        let err = Scanner::new("/definitely/not/here")
            .find_all()
            .await
            .unwrap_err();

        assert!(matches!(err, LibraryError::Io { .. }));
    }

    #[tokio::test]
    async fn test_stream_empty_library() {
        let dir = tempfile::tempdir().unwrap();
        let relay = Relay::new();

        Scanner::new(dir.path()).stream(&relay, |_| {}).await.unwrap();
        assert_eq!(relay.stats().chunks_written, 0);
    }

    #[tokio::test]
    async fn test_stream_plays_file_in_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let data = mp3_frames(3);
        touch(&dir.path().join("Artist/Song.mp3"), &data);
        touch(&dir.path().join("Artist/broken.mp3"), &[0u8; 600]);

        let relay = Relay::new();
        let closer = relay.clone();
        let mut seen = Vec::new();

        let result = Scanner::new(dir.path())
            .chunk_size(512)
            .stream(&relay, |track| {
                seen.push(track.clone());
                // second pass: stop the producer
                if seen.len() == 2 {
                    closer.close();
                }
            })
            .await;

        assert!(matches!(result, Err(LibraryError::RelayClosed)));
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].title, "Song");
        assert_eq!(seen[0].artist, "Artist");

        let stats = relay.stats();
        assert_eq!(stats.chunks_written, 3);
        assert_eq!(stats.bytes_written, data.len() as u64);
    }

    #[tokio::test]
    async fn test_stream_nothing_playable() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("silence.mp3"), &[0u8; 128]);

        let relay = Relay::new();
        let err = Scanner::new(dir.path())
            .stream(&relay, |_| {})
            .await
            .unwrap_err();

        assert!(matches!(err, LibraryError::NothingPlayable));
    }

    #[test]
    fn test_builder() {
        let scanner = Scanner::new("/music")
            .glob("*.ogg")
            .chunk_size(0)
            .shuffle(true);

        assert_eq!(scanner.dir, PathBuf::from("/music"));
        assert_eq!(scanner.glob, "*.ogg");
        assert_eq!(scanner.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(scanner.shuffle);
    }
}
