use std::{
    collections::HashMap,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use rodio::{Decoder, OutputStream, Sink, Source};

use crate::{
    platform::{AudioPlayer, PlatformError, PlatformResult},
    volume::MasterVolume,
};

enum AudioCommand {
    Play {
        id: i32,
        path: PathBuf,
        looping: bool,
        reply: Sender<PlatformResult>,
    },
    Stop(i32),
    ReleaseAll,
}

/// Plays alarm sounds through rodio on a dedicated audio thread.
///
/// The output stream lives on that thread, sinks follow the [`MasterVolume`].
#[derive(Debug, Clone)]
pub struct RodioPlayer {
    sender: Sender<AudioCommand>,
}

impl RodioPlayer {
    #[must_use]
    pub fn new(volume: MasterVolume) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        thread::Builder::new()
            .name("alarm-audio".to_string())
            .spawn(move || audio_thread(&receiver, &volume))
            .map_or_else(
                |e| log::error!("couldn't spawn audio thread: {e}"),
                |_| log::debug!("audio thread started"),
            );
        Self { sender }
    }
}

fn open_sink(stream: &OutputStream, path: &Path, looping: bool) -> PlatformResult<Sink> {
    let file = BufReader::new(File::open(path)?);
    let decoder = Decoder::new(file)
        .map_err(|e| PlatformError::Other(format!("couldn't decode {}: {e}", path.display())))?;
    let sink = Sink::connect_new(stream.mixer());
    if looping {
        sink.append(decoder.repeat_infinite());
    } else {
        sink.append(decoder);
    }
    Ok(sink)
}

fn audio_thread(receiver: &Receiver<AudioCommand>, volume: &MasterVolume) {
    let stream = match rodio::OutputStreamBuilder::open_default_stream() {
        Ok(stream) => Some(stream),
        Err(e) => {
            log::error!("no audio output: {e}");
            None
        }
    };
    let mut sinks: HashMap<i32, Sink> = HashMap::new();
    loop {
        // keep playing sinks at the current (possibly enforced) level
        let level = volume.level() as f32;
        for sink in sinks.values() {
            sink.set_volume(level);
        }
        match receiver.recv_timeout(Duration::from_millis(10)) {
            Ok(AudioCommand::Play {
                id,
                path,
                looping,
                reply,
            }) => {
                let result = stream
                    .as_ref()
                    .ok_or_else(|| PlatformError::Unavailable("audio output".to_string()))
                    .and_then(|stream| open_sink(stream, &path, looping))
                    .map(|sink| {
                        sink.set_volume(level);
                        sink.play();
                        log::info!("alarm {id} playing {}", path.display());
                        if let Some(old) = sinks.insert(id, sink) {
                            old.stop();
                        }
                    });
                // caller may have given up waiting
                let _ = reply.send(result);
            }
            Ok(AudioCommand::Stop(id)) => {
                if let Some(sink) = sinks.remove(&id) {
                    log::info!("alarm {id} sound stopped");
                    sink.stop();
                }
            }
            Ok(AudioCommand::ReleaseAll) => {
                for (_, sink) in sinks.drain() {
                    sink.stop();
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
}

impl AudioPlayer for RodioPlayer {
    fn play(&mut self, id: i32, sound: &Path, looping: bool) -> PlatformResult {
        let (reply, response) = crossbeam_channel::bounded(1);
        self.sender
            .send(AudioCommand::Play {
                id,
                path: sound.to_path_buf(),
                looping,
                reply,
            })
            .map_err(|_| PlatformError::Unavailable("audio thread".to_string()))?;
        response
            .recv()
            .map_err(|_| PlatformError::Unavailable("audio thread".to_string()))?
    }

    fn stop(&mut self, id: i32) {
        if self.sender.send(AudioCommand::Stop(id)).is_err() {
            log::warn!("audio thread is gone, can't stop alarm {id}");
        }
    }

    fn release_all(&mut self) {
        if self.sender.send(AudioCommand::ReleaseAll).is_err() {
            log::warn!("audio thread is gone");
        }
    }
}
