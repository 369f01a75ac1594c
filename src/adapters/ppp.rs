//! PPP over the modem UART using the lwIP PPPoS stack.
//!
//! Needs `CONFIG_LWIP_PPP_SUPPORT` (see `sdkconfig.defaults`).  After the
//! modem answers `CONNECT` a pump thread feeds every received UART byte
//! into lwIP; lwIP writes outgoing frames back through the output callback.
//! The link-status callback flips `up` once IPCP has an address, and the
//! PPP netif becomes the default route so `std::net` sockets use it.

use core::ffi::{c_int, c_void};
use std::ffi::CString;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use esp_idf_hal::delay::TickType;
use esp_idf_hal::uart::UartDriver;
use esp_idf_svc::sys::*;
use log::{info, warn};

use crate::adapters::uart::UartLineTransport;
use crate::error::ConnectivityError;
use crate::modem::{PppAuth, PppCredentials, PppLink};

const READ_CHUNK: usize = 256;
const READ_TIMEOUT_MS: u64 = 100;

/// State shared with the lwIP callbacks and the pump thread.
struct LinkContext {
    uart: Arc<UartDriver<'static>>,
    up: AtomicBool,
    running: AtomicBool,
}

/// `*mut ppp_pcb` moved into the pump thread.  lwIP serialises access
/// through the tcpip thread (`pppos_input_tcpip`).
struct PcbHandle(*mut ppp_pcb);

unsafe impl Send for PcbHandle {}

unsafe extern "C" fn output_cb(
    _pcb: *mut ppp_pcb,
    data: *const c_void,
    len: u32,
    ctx: *mut c_void,
) -> u32 {
    // SAFETY: ctx is the LinkContext boxed in `activate`, alive until the
    // pcb is freed in `deactivate`.
    let ctx = unsafe { &*(ctx as *const LinkContext) };
    let frame = unsafe { core::slice::from_raw_parts(data as *const u8, len as usize) };
    ctx.uart.write(frame).map_or(0, |n| n as u32)
}

unsafe extern "C" fn status_cb(_pcb: *mut ppp_pcb, err_code: c_int, ctx: *mut c_void) {
    // SAFETY: see output_cb.
    let ctx = unsafe { &*(ctx as *const LinkContext) };
    let up = err_code == PPPERR_NONE as c_int;
    if up {
        info!("PPP: link up");
    } else {
        warn!("PPP: link down (err={})", err_code);
    }
    ctx.up.store(up, Ordering::Release);
}

pub struct LwipPpp {
    netif: Box<netif>,
    pcb: *mut ppp_pcb,
    ctx: Option<Box<LinkContext>>,
    pump: Option<JoinHandle<()>>,
    /// lwIP keeps the pointers, not copies.
    auth: Option<(CString, CString)>,
}

impl Default for LwipPpp {
    fn default() -> Self {
        Self::new()
    }
}

impl LwipPpp {
    pub fn new() -> Self {
        Self {
            // SAFETY: netif is a plain C struct; lwIP initialises it in
            // pppapi_pppos_create.
            netif: Box::new(unsafe { core::mem::zeroed() }),
            pcb: core::ptr::null_mut(),
            ctx: None,
            pump: None,
            auth: None,
        }
    }

    fn spawn_pump(&mut self) -> Result<(), ConnectivityError> {
        let ctx = self.ctx.as_deref().ok_or(ConnectivityError::PppFailed)?;
        let uart = Arc::clone(&ctx.uart);
        let pcb = PcbHandle(self.pcb);
        let running: *const AtomicBool = &ctx.running;
        let running = running as usize;
        let handle = thread::Builder::new()
            .name("ppp-rx".into())
            .stack_size(4096)
            .spawn(move || {
                let pcb = pcb;
                // SAFETY: the context outlives the thread; deactivate joins
                // before dropping it.
                let running = unsafe { &*(running as *const AtomicBool) };
                let mut buf = [0u8; READ_CHUNK];
                let ticks = TickType::new_millis(READ_TIMEOUT_MS).ticks();
                while running.load(Ordering::Acquire) {
                    match uart.read(&mut buf, ticks) {
                        Ok(0) => {}
                        Ok(n) => unsafe {
                            pppos_input_tcpip(pcb.0, buf.as_mut_ptr(), n as c_int);
                        },
                        Err(e) => {
                            warn!("PPP: UART read failed: {:?}", e);
                            thread::sleep(std::time::Duration::from_millis(READ_TIMEOUT_MS));
                        }
                    }
                }
            })
            .map_err(|_| ConnectivityError::PppFailed)?;
        self.pump = Some(handle);
        Ok(())
    }
}

impl PppLink<UartLineTransport> for LwipPpp {
    fn activate(
        &mut self,
        transport: &mut UartLineTransport,
        credentials: &PppCredentials<'_>,
    ) -> Result<(), ConnectivityError> {
        if !self.pcb.is_null() {
            self.deactivate();
        }
        let user = CString::new(credentials.user).map_err(|_| ConnectivityError::PppFailed)?;
        let pass = CString::new(credentials.password).map_err(|_| ConnectivityError::PppFailed)?;
        let ctx = Box::new(LinkContext {
            uart: transport.shared(),
            up: AtomicBool::new(false),
            running: AtomicBool::new(true),
        });
        let ctx_ptr = &*ctx as *const LinkContext as *mut c_void;

        // SAFETY: netif and ctx are heap-pinned for the pcb's lifetime.
        let pcb = unsafe {
            pppapi_pppos_create(&mut *self.netif, Some(output_cb), Some(status_cb), ctx_ptr)
        };
        if pcb.is_null() {
            warn!("PPP: pppos_create failed");
            return Err(ConnectivityError::PppFailed);
        }
        self.pcb = pcb;

        let auth = match credentials.auth {
            PppAuth::None => PPPAUTHTYPE_NONE,
            PppAuth::Pap => PPPAUTHTYPE_PAP,
            PppAuth::Chap => PPPAUTHTYPE_CHAP,
        };
        unsafe {
            ppp_set_auth(pcb, auth as u8, user.as_ptr(), pass.as_ptr());
            pppapi_set_default(pcb);
        }
        self.auth = Some((user, pass));

        self.ctx = Some(ctx);
        if let Err(e) = self.spawn_pump() {
            self.deactivate();
            return Err(e);
        }

        let rc = unsafe { pppapi_connect(pcb, 0) };
        if rc != 0 {
            warn!("PPP: connect failed ({})", rc);
            self.deactivate();
            return Err(ConnectivityError::PppFailed);
        }
        info!("PPP: negotiating");
        Ok(())
    }

    fn deactivate(&mut self) {
        if let Some(ctx) = &self.ctx {
            ctx.running.store(false, Ordering::Release);
        }
        if let Some(pump) = self.pump.take() {
            let _ = pump.join();
        }
        if !self.pcb.is_null() {
            unsafe {
                pppapi_close(self.pcb, 1);
                pppapi_free(self.pcb);
            }
            self.pcb = core::ptr::null_mut();
        }
        self.ctx = None;
        self.auth = None;
    }

    fn is_connected(&self) -> bool {
        self.ctx
            .as_ref()
            .is_some_and(|ctx| ctx.up.load(Ordering::Acquire))
    }
}

impl Drop for LwipPpp {
    fn drop(&mut self) {
        self.deactivate();
    }
}
