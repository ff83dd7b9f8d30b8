// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use crate::config::EngineSettings;
use crate::midi::{MidiBuffer, MidiEvent};
use crate::model::RenderGraph;
use crate::voices::{StealPolicy, VoiceManager, VoiceState};

/// Where a block sits on the timeline and in the caller's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockContext {
    /// Transport position of the first frame.
    pub position: u64,
    pub frames: usize,
    pub sample_rate: u32,
    /// Offset of the first frame within the buffer MIDI offsets refer to.
    pub offset: usize,
}

impl BlockContext {
    pub fn end(&self) -> u64 {
        self.position + self.frames as u64
    }

    /// MIDI offset of an absolute sample time inside this block.
    pub fn midi_offset(&self, sample_time: u64) -> usize {
        self.offset + sample_time.saturating_sub(self.position) as usize
    }
}

/// Renders a graph one block at a time. Implementations run on the audio
/// thread and must not block or allocate.
pub trait GraphRenderer: Send {
    /// Writes `block.frames` frames into `out` and any MIDI into `midi`.
    fn render(
        &mut self,
        graph: &RenderGraph,
        block: &BlockContext,
        out: &mut [f32],
        midi: &mut MidiBuffer,
    );

    /// Silences whatever is still sounding. Called when the renderer's
    /// graph leaves the mix.
    fn reset(&mut self, _block: &BlockContext, _midi: &mut MidiBuffer) {}
}

/// Turns a graph's assigned notes into note on and note off messages,
/// allocating a voice for every note. Produces no audio.
pub struct MidiNoteRenderer {
    voices: VoiceManager,
    /// Address of the graph rendered last, to notice swaps.
    graph: usize,
    next_note: usize,
    /// Where the next block should start if playback is continuous.
    expected_position: Option<u64>,
}

impl MidiNoteRenderer {
    pub fn new(max_polyphony: usize, stealing: bool, policy: StealPolicy) -> MidiNoteRenderer {
        MidiNoteRenderer {
            voices: VoiceManager::new(max_polyphony, stealing, policy),
            graph: 0,
            next_note: 0,
            expected_position: None,
        }
    }

    pub fn from_settings(settings: &EngineSettings) -> MidiNoteRenderer {
        MidiNoteRenderer::new(
            settings.max_polyphony(),
            settings.voice_stealing(),
            settings.steal_policy(),
        )
    }

    pub fn voices(&self) -> &VoiceManager {
        &self.voices
    }

    /// Ends every voice whose note finishes inside the block.
    fn release_due(&mut self, block: &BlockContext, midi: &mut MidiBuffer) {
        let end = block.end();
        for voice in self.voices.voices() {
            if voice.state != VoiceState::Idle && voice.stop_time < end {
                midi.push(MidiEvent::note_off(
                    block.midi_offset(voice.stop_time),
                    voice.role,
                    voice.pitch,
                ));
            }
        }
        self.voices.update(end - 1);
    }

    fn release_all(&mut self, offset: usize, midi: &mut MidiBuffer) {
        for voice in self.voices.voices() {
            if voice.state != VoiceState::Idle {
                midi.push(MidiEvent::note_off(offset, voice.role, voice.pitch));
            }
        }
        self.voices.stop_all_voices();
    }
}

impl GraphRenderer for MidiNoteRenderer {
    fn render(
        &mut self,
        graph: &RenderGraph,
        block: &BlockContext,
        out: &mut [f32],
        midi: &mut MidiBuffer,
    ) {
        out.fill(0.0);
        if block.frames == 0 {
            return;
        }

        let key = graph as *const RenderGraph as usize;
        if key != self.graph || self.expected_position != Some(block.position) {
            self.release_all(block.offset, midi);
            self.graph = key;
            self.next_note = graph
                .notes()
                .partition_point(|note| note.start < block.position);
        }

        self.release_due(block, midi);

        let end = block.end();
        let notes = graph.notes();
        while let Some(note) = notes.get(self.next_note) {
            if note.start >= end {
                break;
            }
            self.next_note += 1;

            let role = graph.role_index(&note.role_id).unwrap_or(0);
            let pitch = note.sounding_pitch();
            let allocated = self.voices.allocate_voice(
                pitch,
                note.velocity,
                role.min(u8::MAX as usize) as u8,
                role,
                note.start,
                note.duration,
            );
            if allocated.is_none() {
                continue;
            }

            let offset = block.midi_offset(note.start);
            if let Some(victim) = self.voices.last_stolen() {
                midi.push(MidiEvent::note_off(offset, victim.role, victim.pitch));
            }
            midi.push(MidiEvent::note_on(offset, role, pitch, note.velocity));
        }

        // Notes shorter than the block end inside it.
        self.release_due(block, midi);
        self.expected_position = Some(end);
    }

    fn reset(&mut self, block: &BlockContext, midi: &mut MidiBuffer) {
        self.release_all(block.offset, midi);
        self.expected_position = None;
    }
}

impl std::fmt::Debug for MidiNoteRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidiNoteRenderer")
            .field("voices", &self.voices)
            .field("next_note", &self.next_note)
            .finish()
    }
}
