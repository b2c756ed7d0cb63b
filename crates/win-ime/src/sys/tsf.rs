use tracing::trace;
use windows::{
    Win32::{
        System::Com::{CLSCTX_INPROC_SERVER, CoCreateInstance},
        UI::TextServices::{
            CLSID_TF_ThreadMgr, GUID_COMPARTMENT_KEYBOARD_INPUTMODE_CONVERSION,
            GUID_COMPARTMENT_KEYBOARD_INPUTMODE_SENTENCE, GUID_COMPARTMENT_KEYBOARD_OPENCLOSE,
            ITfThreadMgr,
        },
    },
    core::GUID,
};

use super::com;
use crate::{Compartment, Result};

fn guid(c: Compartment) -> &'static GUID {
    match c {
        Compartment::Conversion => &GUID_COMPARTMENT_KEYBOARD_INPUTMODE_CONVERSION,
        Compartment::Sentence => &GUID_COMPARTMENT_KEYBOARD_INPUTMODE_SENTENCE,
        Compartment::OpenClose => &GUID_COMPARTMENT_KEYBOARD_OPENCLOSE,
    }
}

fn read(c: Compartment) -> Result<i32> {
    com::ensure();
    let mgr: ITfThreadMgr =
        unsafe { CoCreateInstance(&CLSID_TF_ThreadMgr, None, CLSCTX_INPROC_SERVER) }?;
    let compartments = unsafe { mgr.GetGlobalCompartment() }?;
    let compartment = unsafe { compartments.GetCompartment(guid(c)) }?;
    let value = unsafe { compartment.GetValue() }?;
    Ok(i32::try_from(&value)?)
}

pub(crate) fn compartment_value(c: Compartment) -> Option<i32> {
    match read(c) {
        Ok(v) => Some(v),
        Err(e) => {
            trace!(compartment = ?c, error = %e, "tsf_compartment_unavailable");
            None
        }
    }
}
