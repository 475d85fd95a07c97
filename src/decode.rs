//! Decode pipeline state machine.
//!
//! The two historical decoding protocols behave differently on the wire:
//! the newer one is an explicit submit/receive pair with backpressure, the
//! older one is a single combined call that may or may not hand back a frame
//! alongside consuming the packet. Callers get one push/pull contract; the
//! machine's whole job is erasing that difference while preserving the
//! drain-before-resubmit backpressure rule.
//!
//! The protocol split is decided once, at open time, by picking an adapter
//! variant. The machine itself never looks at a version again.

#![expect(
    unsafe_code,
    reason = "adapters drive native decode entry points over raw handles"
)]

use std::ffi::{c_int, c_void};
use std::fmt;

use crate::accessor;
use crate::error::{DecodeError, ShapeError};
use crate::handle::{BorrowedHandle, OwnedHandle, Release, StructHandle};
use crate::shape::{descriptor_for, StructKind};
use crate::tables::{CombinedFns, SplitFns};

// ============================================================================
// Native status codes
// ============================================================================

/// A raw native return code, decoded just enough for the machine to act on.
///
/// Only the backpressure codes are interpreted here; every other negative
/// value is surfaced verbatim inside [`DecodeError::Native`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeStatus(pub c_int);

impl NativeStatus {
    /// "Not now, pull frames first" (negated EAGAIN).
    pub const TRY_AGAIN: NativeStatus = NativeStatus(-11);
    /// Allocation failure (negated ENOMEM).
    pub const OUT_OF_MEMORY: NativeStatus = NativeStatus(-12);
    /// End of the bitstream, packed from the family's four-char error tag.
    pub const END_OF_FILE: NativeStatus = NativeStatus(-541_478_725);

    /// Whether the code signals success.
    pub fn is_ok(self) -> bool {
        self.0 >= 0
    }

    /// Whether the code is the backpressure signal.
    pub fn is_try_again(self) -> bool {
        self == Self::TRY_AGAIN
    }

    /// Whether the code is the end-of-stream signal.
    pub fn is_end_of_file(self) -> bool {
        self == Self::END_OF_FILE
    }
}

impl fmt::Display for NativeStatus {
    fn fmt(&self, fm: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::TRY_AGAIN => write!(fm, "{} (try again)", self.0),
            Self::END_OF_FILE => write!(fm, "{} (end of file)", self.0),
            _ => write!(fm, "{}", self.0),
        }
    }
}

// ============================================================================
// State machine surface
// ============================================================================

/// Decoder session state. `EndOfBitstream` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    /// Created, native context not opened yet.
    NotOpened,
    /// Ready to accept compressed input.
    NeedsMoreData,
    /// Frames may be waiting; pull before pushing more input.
    RetrieveFrames,
    /// Fully drained after flushing. No frame is ever returned again.
    EndOfBitstream,
    /// A native call failed; the session is unusable.
    Error,
}

/// What happened to a submitted packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The packet was consumed.
    Accepted,
    /// The decoder is backpressured; drain `decode_next_frame` until it
    /// returns nothing, then resubmit the identical packet.
    NotSentPullFramesFirst,
}

/// Result of one submit call, as the adapter saw it.
pub enum SubmitOutcome {
    /// Packet consumed. `frame_ready` is set when the call itself already
    /// produced a frame (only the combined protocol does this).
    Accepted {
        /// A frame is buffered and must be pulled before more input.
        frame_ready: bool,
    },
    /// The native side refused the packet until frames are drained.
    Backpressure,
    /// Hard failure.
    Failed(NativeStatus),
}

/// Result of one pull attempt, as the adapter saw it.
pub enum PollOutcome {
    /// A decoded frame.
    Frame {
        /// The frame, owned by the caller from here on.
        frame: OwnedHandle,
        /// Whether more frames may follow without new input; when false the
        /// machine drops back to wanting input.
        more: bool,
    },
    /// Nothing available right now.
    Pending,
    /// The stream is fully drained.
    Drained,
    /// Hard failure.
    Failed(NativeStatus),
}

/// One decoding protocol, normalized to submit/poll.
///
/// Selected once when the session is opened; the machine drives whichever
/// variant it was given and never branches on versions itself.
pub trait DecodeAdapter {
    /// Open the native decoder context.
    fn open(&mut self) -> Result<(), NativeStatus>;

    /// Push one non-empty packet.
    fn submit(&mut self, packet: BorrowedHandle) -> SubmitOutcome;

    /// Signal that no further input will arrive.
    fn begin_flush(&mut self) -> Result<(), NativeStatus>;

    /// Pull one frame if available. `flushing` selects drain behavior.
    fn poll(&mut self, flushing: bool) -> PollOutcome;
}

/// Per-stream decoding session; not reusable once terminal.
pub struct DecoderSession {
    state: DecodeState,
    flushing: bool,
    adapter: Box<dyn DecodeAdapter>,
}

impl DecoderSession {
    /// Wrap an adapter; the session starts unopened.
    pub fn new(adapter: Box<dyn DecodeAdapter>) -> Self {
        Self {
            state: DecodeState::NotOpened,
            flushing: false,
            adapter,
        }
    }

    /// Current state.
    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// Whether flushing has been requested.
    pub fn is_flushing(&self) -> bool {
        self.flushing
    }

    /// Open the native decoder. Moves to `NeedsMoreData` on success and to
    /// the terminal `Error` state on native failure.
    pub fn open_for_decoding(&mut self) -> Result<(), DecodeError> {
        if self.state != DecodeState::NotOpened {
            return Err(DecodeError::InvalidState {
                op: "open_for_decoding",
                state: self.state,
            });
        }
        match self.adapter.open() {
            Ok(()) => {
                self.state = DecodeState::NeedsMoreData;
                Ok(())
            }
            Err(status) => {
                self.state = DecodeState::Error;
                Err(DecodeError::Native {
                    op: "open_for_decoding",
                    status,
                })
            }
        }
    }

    /// Push one packet of compressed input.
    ///
    /// In `RetrieveFrames`, the packet is not submitted at all and the caller
    /// is told to pull first. Empty packets and packets after flushing are
    /// usage errors.
    pub fn send_packet(&mut self, packet: BorrowedHandle) -> Result<SendOutcome, DecodeError> {
        if self.flushing {
            return Err(DecodeError::AlreadyFlushing);
        }
        match self.state {
            DecodeState::NeedsMoreData => {}
            DecodeState::RetrieveFrames => return Ok(SendOutcome::NotSentPullFramesFirst),
            state => {
                return Err(DecodeError::InvalidState {
                    op: "send_packet",
                    state,
                })
            }
        }
        if accessor::read_i32(&packet, "size")? == 0 {
            return Err(DecodeError::EmptyPacket);
        }
        match self.adapter.submit(packet) {
            SubmitOutcome::Accepted { frame_ready } => {
                if frame_ready {
                    self.state = DecodeState::RetrieveFrames;
                }
                Ok(SendOutcome::Accepted)
            }
            SubmitOutcome::Backpressure => {
                self.state = DecodeState::RetrieveFrames;
                Ok(SendOutcome::NotSentPullFramesFirst)
            }
            SubmitOutcome::Failed(status) => {
                self.state = DecodeState::Error;
                Err(DecodeError::Native {
                    op: "send_packet",
                    status,
                })
            }
        }
    }

    /// Enter the flushing phase. Allowed once per session.
    pub fn set_flushing(&mut self) -> Result<(), DecodeError> {
        if self.flushing {
            return Err(DecodeError::AlreadyFlushing);
        }
        match self.state {
            DecodeState::NeedsMoreData | DecodeState::RetrieveFrames => {}
            state => {
                return Err(DecodeError::InvalidState {
                    op: "set_flushing",
                    state,
                })
            }
        }
        match self.adapter.begin_flush() {
            Ok(()) => {
                self.flushing = true;
                self.state = DecodeState::RetrieveFrames;
                Ok(())
            }
            Err(status) => {
                self.state = DecodeState::Error;
                Err(DecodeError::Native {
                    op: "set_flushing",
                    status,
                })
            }
        }
    }

    /// Pull the next decoded frame if one is available.
    ///
    /// Outside `RetrieveFrames` this is side-effect free: `NeedsMoreData`
    /// and `EndOfBitstream` just report no frame, and the remaining states
    /// are usage errors.
    pub fn decode_next_frame(&mut self) -> Result<Option<OwnedHandle>, DecodeError> {
        match self.state {
            DecodeState::RetrieveFrames => {}
            DecodeState::NeedsMoreData | DecodeState::EndOfBitstream => return Ok(None),
            state => {
                return Err(DecodeError::InvalidState {
                    op: "decode_next_frame",
                    state,
                })
            }
        }
        match self.adapter.poll(self.flushing) {
            PollOutcome::Frame { frame, more } => {
                if !more {
                    self.state = DecodeState::NeedsMoreData;
                }
                Ok(Some(frame))
            }
            PollOutcome::Pending => {
                self.state = if self.flushing {
                    DecodeState::EndOfBitstream
                } else {
                    DecodeState::NeedsMoreData
                };
                Ok(None)
            }
            PollOutcome::Drained => {
                self.state = DecodeState::EndOfBitstream;
                Ok(None)
            }
            PollOutcome::Failed(status) => {
                self.state = DecodeState::Error;
                Err(DecodeError::Native {
                    op: "decode_next_frame",
                    status,
                })
            }
        }
    }
}

// ============================================================================
// Native adapters
// ============================================================================

/// Native pieces both adapters drive the same way.
///
/// Owns the decoder context; it is released through the handle's strategy
/// when the adapter (and with it the session) is dropped.
pub struct CodecHandles {
    /// Allocated-but-not-yet-opened decoder context.
    pub ctx: OwnedHandle,
    /// The decoder implementation to open the context with.
    pub codec: *const c_void,
    /// `open2`-style context opener.
    pub open: unsafe extern "C" fn(*mut c_void, *const c_void, *mut *mut c_void) -> c_int,
    /// Frame allocator from the shared-utility module.
    pub frame_alloc: unsafe extern "C" fn() -> *mut c_void,
    /// Matching frame release.
    pub frame_free: unsafe extern "C" fn(*mut *mut c_void),
    /// Shared-utility major, tagged onto produced frame handles.
    pub util_major: u32,
}

impl CodecHandles {
    fn ctx_ptr(&self) -> *mut c_void {
        self.ctx.addr().cast()
    }

    fn open_context(&self) -> Result<(), NativeStatus> {
        let status = NativeStatus(unsafe {
            (self.open)(self.ctx_ptr(), self.codec, std::ptr::null_mut())
        });
        if status.is_ok() {
            Ok(())
        } else {
            Err(status)
        }
    }

    fn alloc_frame(&self) -> Result<*mut c_void, NativeStatus> {
        let frame = unsafe { (self.frame_alloc)() };
        if frame.is_null() {
            Err(NativeStatus::OUT_OF_MEMORY)
        } else {
            Ok(frame)
        }
    }

    fn release_frame(&self, frame: *mut c_void) {
        let mut p = frame;
        unsafe { (self.frame_free)(&mut p) };
    }

    /// Wrap a native frame the caller now owns.
    fn own_frame(&self, frame: *mut c_void) -> OwnedHandle {
        unsafe {
            OwnedHandle::from_native(
                frame.cast(),
                StructKind::Frame,
                self.util_major,
                Release::NativeIndirect(self.frame_free),
            )
        }
    }
}

/// Submit/receive protocol (codec major 58 and newer).
pub struct SplitDecode {
    handles: CodecHandles,
    fns: SplitFns,
}

impl SplitDecode {
    /// Pair the shared handles with the split entry points.
    pub fn new(handles: CodecHandles, fns: SplitFns) -> Self {
        Self { handles, fns }
    }
}

impl DecodeAdapter for SplitDecode {
    fn open(&mut self) -> Result<(), NativeStatus> {
        self.handles.open_context()
    }

    fn submit(&mut self, packet: BorrowedHandle) -> SubmitOutcome {
        let status = NativeStatus(unsafe {
            (self.fns.send_packet)(self.handles.ctx_ptr(), packet.addr().cast())
        });
        if status.is_ok() {
            SubmitOutcome::Accepted { frame_ready: false }
        } else if status.is_try_again() {
            SubmitOutcome::Backpressure
        } else {
            SubmitOutcome::Failed(status)
        }
    }

    fn begin_flush(&mut self) -> Result<(), NativeStatus> {
        // A null packet is the native drain signal. Already-draining is not
        // a failure.
        let status = NativeStatus(unsafe {
            (self.fns.send_packet)(self.handles.ctx_ptr(), std::ptr::null())
        });
        if status.is_ok() || status.is_end_of_file() {
            Ok(())
        } else {
            Err(status)
        }
    }

    fn poll(&mut self, _flushing: bool) -> PollOutcome {
        let frame = match self.handles.alloc_frame() {
            Ok(frame) => frame,
            Err(status) => return PollOutcome::Failed(status),
        };
        let status =
            NativeStatus(unsafe { (self.fns.receive_frame)(self.handles.ctx_ptr(), frame) });
        if status.is_ok() {
            return PollOutcome::Frame {
                frame: self.handles.own_frame(frame),
                more: true,
            };
        }
        self.handles.release_frame(frame);
        if status.is_try_again() {
            PollOutcome::Pending
        } else if status.is_end_of_file() {
            PollOutcome::Drained
        } else {
            PollOutcome::Failed(status)
        }
    }
}

/// Combined-decode protocol (codec major 57 and older).
///
/// The native call both consumes the packet and may emit a frame, so the
/// adapter manufactures the split the protocol lacks by buffering that frame
/// until the caller pulls it. There is no native flush primitive either;
/// draining re-invokes the combined call with an empty packet shell until it
/// stops producing.
pub struct CombinedDecode {
    handles: CodecHandles,
    fns: CombinedFns,
    codec_major: u32,
    empty_packet_size: usize,
    pending: Option<OwnedHandle>,
}

impl CombinedDecode {
    /// Pair the shared handles with the combined entry points.
    ///
    /// Fails only if no packet layout is known for `codec_major`, which the
    /// drain path needs to build its empty packet shells.
    pub fn new(
        handles: CodecHandles,
        fns: CombinedFns,
        codec_major: u32,
    ) -> Result<Self, ShapeError> {
        let empty_packet_size = descriptor_for(StructKind::Packet, codec_major)
            .ok_or(ShapeError::UnsupportedShape {
                kind: StructKind::Packet,
                major: codec_major,
            })?
            .size;
        Ok(Self {
            handles,
            fns,
            codec_major,
            empty_packet_size,
            pending: None,
        })
    }

    fn decode_one(&self, packet: *const c_void) -> Result<Option<OwnedHandle>, NativeStatus> {
        let frame = self.handles.alloc_frame()?;
        let mut got_frame: c_int = 0;
        let status = NativeStatus(unsafe {
            (self.fns.decode_video)(self.handles.ctx_ptr(), frame, &mut got_frame, packet)
        });
        if !status.is_ok() {
            self.handles.release_frame(frame);
            return Err(status);
        }
        if got_frame != 0 {
            Ok(Some(self.handles.own_frame(frame)))
        } else {
            self.handles.release_frame(frame);
            Ok(None)
        }
    }

    /// A zeroed, initialized packet shell with no payload, for draining.
    fn empty_packet(&self) -> OwnedHandle {
        let shell = OwnedHandle::alloc_zeroed(
            StructKind::Packet,
            self.codec_major,
            self.empty_packet_size,
        );
        unsafe { (self.fns.init_packet)(shell.addr().cast()) };
        shell
    }
}

impl DecodeAdapter for CombinedDecode {
    fn open(&mut self) -> Result<(), NativeStatus> {
        self.handles.open_context()
    }

    fn submit(&mut self, packet: BorrowedHandle) -> SubmitOutcome {
        match self.decode_one(packet.addr().cast()) {
            Ok(Some(frame)) => {
                self.pending = Some(frame);
                SubmitOutcome::Accepted { frame_ready: true }
            }
            Ok(None) => SubmitOutcome::Accepted { frame_ready: false },
            Err(status) => SubmitOutcome::Failed(status),
        }
    }

    fn begin_flush(&mut self) -> Result<(), NativeStatus> {
        // No native flush primitive in this protocol; draining happens in
        // `poll`.
        Ok(())
    }

    fn poll(&mut self, flushing: bool) -> PollOutcome {
        if let Some(frame) = self.pending.take() {
            return PollOutcome::Frame {
                frame,
                more: flushing,
            };
        }
        if !flushing {
            return PollOutcome::Pending;
        }
        let shell = self.empty_packet();
        match self.decode_one(shell.addr().cast()) {
            Ok(Some(frame)) => PollOutcome::Frame { frame, more: true },
            Ok(None) => PollOutcome::Drained,
            Err(status) => PollOutcome::Failed(status),
        }
    }
}
