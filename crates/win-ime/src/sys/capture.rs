use windows::Win32::{
    Foundation::HWND,
    Graphics::Gdi::{
        BI_RGB, BITMAPINFO, BITMAPINFOHEADER, BitBlt, CreateCompatibleBitmap, CreateCompatibleDC,
        DIB_RGB_COLORS, DeleteDC, DeleteObject, GetDC, GetDIBits, HBITMAP, HDC, HGDIOBJ,
        ReleaseDC, SRCCOPY, SelectObject,
    },
};

use crate::{Error, Rect, Result};

/// Screen DC, memory DC and bitmap, torn down in reverse order on drop.
struct Surface {
    /// Screen device context.
    screen: HDC,
    /// Memory device context holding `bitmap`.
    mem: HDC,
    /// Off-screen bitmap the screen is copied into.
    bitmap: HBITMAP,
    /// Object `bitmap` replaced in `mem`.
    previous: HGDIOBJ,
}

impl Surface {
    fn new(width: i32, height: i32) -> Result<Self> {
        let screen = unsafe { GetDC(HWND::default()) };
        if screen.is_invalid() {
            return Err(Error::Os("GetDC failed".into()));
        }
        let mem = unsafe { CreateCompatibleDC(screen) };
        let bitmap = unsafe { CreateCompatibleBitmap(screen, width, height) };
        let previous = unsafe { SelectObject(mem, bitmap) };
        let s = Self {
            screen,
            mem,
            bitmap,
            previous,
        };
        if mem.is_invalid() || bitmap.is_invalid() {
            return Err(Error::Os("could not create capture bitmap".into()));
        }
        Ok(s)
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe {
            if !self.mem.is_invalid() && !self.previous.is_invalid() {
                SelectObject(self.mem, self.previous);
            }
            if !self.bitmap.is_invalid() {
                let _ = DeleteObject(self.bitmap);
            }
            if !self.mem.is_invalid() {
                let _ = DeleteDC(self.mem);
            }
            ReleaseDC(HWND::default(), self.screen);
        }
    }
}

/// Copy `rect` from the screen and return its pixels as top-down BGRA.
pub(crate) fn capture_region(rect: Rect) -> Result<Vec<u8>> {
    if rect.is_empty() {
        return Err(Error::Os(format!("empty capture rect {rect:?}")));
    }
    let (w, h) = (rect.width, rect.height);
    let surface = Surface::new(w, h)?;
    unsafe {
        BitBlt(
            surface.mem,
            0,
            0,
            w,
            h,
            surface.screen,
            rect.left,
            rect.top,
            SRCCOPY,
        )
    }
    .map_err(|e| Error::Os(format!("BitBlt: {e}")))?;

    let mut info = BITMAPINFO {
        bmiHeader: BITMAPINFOHEADER {
            biSize: size_of::<BITMAPINFOHEADER>() as u32,
            biWidth: w,
            biHeight: -h,
            biPlanes: 1,
            biBitCount: 32,
            biCompression: BI_RGB.0,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut pixels = vec![0u8; rect.area() * 4];
    let lines = unsafe {
        GetDIBits(
            surface.mem,
            surface.bitmap,
            0,
            h as u32,
            Some(pixels.as_mut_ptr().cast()),
            &mut info,
            DIB_RGB_COLORS,
        )
    };
    if lines == 0 {
        return Err(Error::Os("GetDIBits failed".into()));
    }
    Ok(pixels)
}
