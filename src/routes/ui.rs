//! Guest upload page
//!
//! Runs the same loop as the terminal client: one request per file, one
//! status icon per file, then a thanks message. `/?relay` posts files
//! through `/api/files` instead of uploading straight to the bucket.

use axum::{response::Html, routing::get, Router};

pub fn router() -> Router {
    Router::new().route("/", get(index))
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r#"<!doctype html>
<html lang="pl">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Zdjecia z wesela</title>
  <style>
    body {
      margin: 0; min-height: 100vh; display: flex; align-items: center; justify-content: center;
      font-family: "Quicksand", "Segoe UI", sans-serif; color: #E9E5E3;
      background: #274442 url('/image/background_eucalyptus.jpg') center / cover no-repeat;
    }
    .card { background: rgba(39, 68, 66, 0.85); border-radius: 12px; padding: 2rem; min-width: 18rem; text-align: center; }
    label { display: inline-block; padding: 1rem 1.5rem; border: 2px solid #748E81; border-radius: 8px; cursor: pointer; font-size: 1.2rem; }
    input[type=file] { display: none; }
    .file-status { display: flex; align-items: center; gap: 0.75rem; margin: 0.4rem 0; text-align: left; }
    .status-icon { width: 1.5rem; color: #748E81; font-size: 1.3rem; }
    .spin { display: inline-block; animation: spin 1.5s linear infinite; }
    @keyframes spin { to { transform: rotate(360deg); } }
    .hidden { display: none; }
  </style>
</head>
<body>
  <div class="card">
    <div id="picker">
      <label for="file">Wybierz zdjecia lub film</label>
      <input type="file" id="file" accept="image/*,video/*" multiple />
    </div>
    <div id="uploadStatusBox" class="hidden"></div>
    <div id="thanks" class="hidden">
      <p>Dziekujemy!</p>
      <p>Wyslemy wam zdjecia po weselu!</p>
    </div>
  </div>

  <script>
    const WAIT_UNTIL_FINISHED_MS = 1000;
    const THANKS_DURATION_MS = 5000;
    const ICONS = { uploading: '<span class="spin">&#8635;</span>', success: '&#10004;', failure: '&#10008;' };
    const relayMode = new URLSearchParams(window.location.search).has('relay');

    const picker = document.getElementById('picker');
    const statusBox = document.getElementById('uploadStatusBox');
    const thanks = document.getElementById('thanks');
    const input = document.getElementById('file');
    let statuses = [];

    function show(view) {
      picker.classList.toggle('hidden', view !== 'picker');
      statusBox.classList.toggle('hidden', view !== 'uploading');
      thanks.classList.toggle('hidden', view !== 'thanks');
    }

    function render() {
      statusBox.innerHTML = '';
      statuses.forEach((entry) => {
        const row = document.createElement('div');
        row.className = 'file-status';
        const icon = document.createElement('div');
        icon.className = 'status-icon';
        icon.innerHTML = ICONS[entry.status] || '';
        const name = document.createElement('span');
        name.className = 'file-name';
        name.textContent = entry.name;
        row.append(icon, name);
        statusBox.append(row);
      });
    }

    function updateFileStatus(index, status) {
      if (index < 0 || index >= statuses.length) return;
      statuses[index] = { ...statuses[index], status };
      render();
    }

    async function getSignedUrl(file, objectName) {
      const response = await fetch('/api/generatePutUrl', {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify({ filename: objectName, contentType: file.type }),
      });
      if (!response.ok) return null;
      const data = await response.json();
      return data.url || null;
    }

    async function uploadDirect(file) {
      const objectName = `${Date.now()}-${file.name}`;
      const url = await getSignedUrl(file, objectName);
      if (!url) return false;
      const headers = file.type ? { 'Content-Type': file.type } : {};
      const result = await fetch(url, { method: 'PUT', headers, body: file });
      return result.ok;
    }

    async function uploadRelayed(file) {
      const form = new FormData();
      form.append('file', file);
      const response = await fetch('/api/files', { method: 'POST', body: form });
      if (!response.ok) return false;
      const outcomes = await response.json();
      return Array.isArray(outcomes) && outcomes.length > 0 && outcomes[0].success;
    }

    async function uploadAll(files) {
      statuses = files.map((file) => ({ name: file.name, status: 'uploading' }));
      render();
      show('uploading');

      let failures = 0;
      for (let i = 0; i < files.length; i++) {
        let ok = false;
        try {
          ok = relayMode ? await uploadRelayed(files[i]) : await uploadDirect(files[i]);
        } catch (err) {
          console.error(`File: ${files[i].name} upload failed`, err);
        }
        if (!ok) failures++;
        updateFileStatus(i, ok ? 'success' : 'failure');
      }

      if (failures > 0 && relayMode) {
        alert(`Nie udalo sie wyslac ${failures} z ${files.length} plikow.`);
      }

      setTimeout(() => {
        show('thanks');
        setTimeout(() => {
          input.value = '';
          show('picker');
        }, THANKS_DURATION_MS);
      }, WAIT_UNTIL_FINISHED_MS);
    }

    input.addEventListener('change', async (event) => {
      const selected = Array.from(event.target.files || []);
      if (selected.length) await uploadAll(selected);
    });
  </script>
</body>
</html>"#;
