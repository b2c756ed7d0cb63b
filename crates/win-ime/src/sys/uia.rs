use tracing::{debug, trace};
use windows::{
    Win32::{
        System::Com::{CLSCTX_INPROC_SERVER, CoCreateInstance},
        UI::{
            Accessibility::{CUIAutomation, IUIAutomation, TreeScope_Descendants},
            WindowsAndMessaging::FindWindowW,
        },
    },
    core::{PCWSTR, w},
};

use super::com;
use crate::{Rect, Result};

/// Search the taskbar's accessibility tree for the input indicator button.
pub(crate) fn find_input_indicator(names: &[String]) -> Result<Option<Rect>> {
    com::ensure();
    let tray = unsafe { FindWindowW(w!("Shell_TrayWnd"), PCWSTR::null()) }?;
    let uia: IUIAutomation =
        unsafe { CoCreateInstance(&CUIAutomation, None, CLSCTX_INPROC_SERVER) }?;
    let root = unsafe { uia.ElementFromHandle(tray) }?;
    let all = unsafe { uia.CreateTrueCondition() }?;
    let found = unsafe { root.FindAll(TreeScope_Descendants, &all) }?;
    let len = unsafe { found.Length() }?;
    for i in 0..len {
        let Ok(el) = (unsafe { found.GetElement(i) }) else {
            continue;
        };
        let name = unsafe { el.CurrentName() }
            .map(|s| s.to_string())
            .unwrap_or_default();
        if !names.iter().any(|n| name.contains(n.as_str())) {
            continue;
        }
        let r = unsafe { el.CurrentBoundingRectangle() }?;
        let rect = Rect::from_edges(r.left, r.top, r.right, r.bottom);
        debug!(name = %name, ?rect, "input_indicator_found");
        return Ok(Some(rect));
    }
    trace!(elements = len, "input_indicator_not_found");
    Ok(None)
}
